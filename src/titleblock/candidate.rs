//! Candidate collection.
//!
//! A read-only scan over every paper-space layout for block references
//! whose definition is an external or overlay reference. No name filtering
//! happens here; ranking the candidates is the scoring engine's job.

use crate::document::{Document, Entity};
use crate::types::{Handle, Vector2};

/// One observed block reference to an external/overlay definition.
///
/// Candidates are rebuilt fresh on every resolution pass and never survive
/// a scan: the definition handle they carry is only valid until the next
/// mutating operation.
#[derive(Debug, Clone, PartialEq)]
pub struct XrefCandidate {
    /// Handle of the external reference definition
    pub definition: Handle,
    /// Handle of the observed block reference entity
    pub reference: Handle,
    /// Layout the reference was found on
    pub layout_name: String,
    /// Block name of the definition
    pub block_name: String,
    /// Source path (resolved when available, raw otherwise)
    pub path_name: String,
    /// Insertion point, Z dropped
    pub insertion_point: Vector2,
    /// How many candidates share this layout
    pub layout_xref_count: usize,
    /// Confidence score assigned by the scoring engine
    pub score: i32,
}

/// Scan the document's paper-space layouts for candidates.
pub fn collect_candidates(doc: &Document) -> Vec<XrefCandidate> {
    let mut candidates = Vec::new();

    for layout in doc.paper_layouts() {
        for &entity_handle in &layout.entities {
            let Some(block_ref) = doc.entity(entity_handle).and_then(Entity::as_block_reference)
            else {
                continue;
            };
            let Some(def) = doc.xref_by_handle(block_ref.definition) else {
                continue;
            };
            candidates.push(XrefCandidate {
                definition: def.handle,
                reference: block_ref.handle,
                layout_name: layout.name.clone(),
                block_name: def.name.clone(),
                path_name: def.effective_path().to_string(),
                insertion_point: block_ref.insert_point.xy(),
                layout_xref_count: 0,
                score: 0,
            });
        }
    }

    // Uniqueness signal: how many candidates share each layout.
    for i in 0..candidates.len() {
        let count = candidates
            .iter()
            .filter(|c| c.layout_name == candidates[i].layout_name)
            .count();
        candidates[i].layout_xref_count = count;
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BlockReference, Entity, XrefKind};
    use crate::types::Vector3;

    #[test]
    fn test_model_space_is_ignored() {
        let mut doc = Document::new();
        doc.add_layout("A-101").unwrap();
        let def = doc.attach_xref("x-tb", "x-tb.dwg", XrefKind::Attached).unwrap();
        doc.add_entity(
            "Model",
            Entity::BlockReference(BlockReference::new(def, Vector3::ZERO)),
        )
        .unwrap();

        assert!(collect_candidates(&doc).is_empty());
    }

    #[test]
    fn test_local_blocks_are_ignored() {
        let mut doc = Document::new();
        doc.add_layout("A-101").unwrap();
        // A reference pointing at a handle that is not an xref definition.
        doc.add_entity(
            "A-101",
            Entity::BlockReference(BlockReference::new(Handle::new(0xDEAD), Vector3::ZERO)),
        )
        .unwrap();

        assert!(collect_candidates(&doc).is_empty());
    }

    #[test]
    fn test_layout_xref_count() {
        let mut doc = Document::new();
        doc.add_layout("A-101").unwrap();
        doc.add_layout("A-102").unwrap();
        let a = doc.attach_xref("a", "a.dwg", XrefKind::Attached).unwrap();
        let b = doc.attach_xref("b", "b.dwg", XrefKind::Overlay).unwrap();

        doc.add_entity(
            "A-101",
            Entity::BlockReference(BlockReference::new(a, Vector3::ZERO)),
        )
        .unwrap();
        doc.add_entity(
            "A-101",
            Entity::BlockReference(BlockReference::new(b, Vector3::ZERO)),
        )
        .unwrap();
        doc.add_entity(
            "A-102",
            Entity::BlockReference(BlockReference::new(a, Vector3::ZERO)),
        )
        .unwrap();

        let candidates = collect_candidates(&doc);
        assert_eq!(candidates.len(), 3);
        for c in &candidates {
            match c.layout_name.as_str() {
                "A-101" => assert_eq!(c.layout_xref_count, 2),
                "A-102" => assert_eq!(c.layout_xref_count, 1),
                other => panic!("unexpected layout {}", other),
            }
        }
    }

    #[test]
    fn test_candidate_carries_resolved_path_and_xy() {
        let mut doc = Document::with_base_dir("C:/proj");
        doc.resolver_mut().register_file("C:/proj/xrefs/x-tb.dwg");
        doc.add_layout("A-101").unwrap();
        let def = doc
            .attach_xref("x-tb", "xrefs/x-tb.dwg", XrefKind::Attached)
            .unwrap();
        doc.add_entity(
            "A-101",
            Entity::BlockReference(BlockReference::new(def, Vector3::new(1.0, 2.0, 50.0))),
        )
        .unwrap();

        let candidates = collect_candidates(&doc);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].path_name, "c:/proj/xrefs/x-tb.dwg");
        assert_eq!(candidates[0].insertion_point, Vector2::new(1.0, 2.0));
    }
}
