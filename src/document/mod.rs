//! In-memory host document model.
//!
//! The cleanup pipeline consumes a narrow slice of the host: layouts and
//! their top-level entities, layer lock state, external reference
//! definitions and the mutating operations on them
//! (attach/detach/bind/reload/retarget). This module implements that slice
//! so the pipeline can be driven and tested without a live host; the
//! operations keep the host's observable behavior, including the ones that
//! make protection hard: attach reissues identities, and a bind silently
//! skips overlays and unreferenced definitions.

use ahash::AHashMap;
use indexmap::IndexMap;
use tracing::debug;

use crate::error::{GuardError, Result};
use crate::types::Handle;

pub mod entity;
pub mod layer;
pub mod layout;
pub mod path;
pub mod xref;

pub use entity::{BlockReference, Entity, PdfUnderlay, RasterImage};
pub use layer::{Layer, LayerFlags};
pub use layout::Layout;
pub use path::PathResolver;
pub use xref::{XrefDefinition, XrefKind, XrefStatus};

/// A CAD document holding sheets, layers and external references.
#[derive(Debug, Clone)]
pub struct Document {
    /// Layouts keyed by uppercase name
    layouts: IndexMap<String, Layout>,
    /// Layers keyed by uppercase name
    layers: IndexMap<String, Layer>,
    /// External reference definitions keyed by uppercase block name
    xrefs: IndexMap<String, XrefDefinition>,
    /// Definitions merged into the document by a bind, keyed by uppercase name
    local_blocks: IndexMap<String, Handle>,
    /// All entities, indexed by handle
    entities: AHashMap<Handle, Entity>,
    /// Path resolution against the document folder and search paths
    resolver: PathResolver,
    /// Name of the currently active layout
    active_layout: String,
    /// Next handle to assign
    next_handle: u64,
}

impl Document {
    /// Create a new empty document with a model layout and layer "0"
    pub fn new() -> Self {
        Self::with_base_dir("")
    }

    /// Create a document whose resolver is rooted at the given directory
    pub fn with_base_dir(base_dir: impl Into<String>) -> Self {
        let mut doc = Document {
            layouts: IndexMap::new(),
            layers: IndexMap::new(),
            xrefs: IndexMap::new(),
            local_blocks: IndexMap::new(),
            entities: AHashMap::new(),
            resolver: PathResolver::new(base_dir),
            active_layout: "Model".to_string(),
            next_handle: 0x10,
        };

        let mut model = Layout::model();
        model.handle = doc.allocate_handle();
        doc.layouts.insert(model.name.to_uppercase(), model);

        let mut layer0 = Layer::layer_0();
        layer0.handle = doc.allocate_handle();
        doc.layers.insert(layer0.name.to_uppercase(), layer0);

        doc
    }

    /// Allocate a new unique handle
    pub fn allocate_handle(&mut self) -> Handle {
        let handle = Handle::new(self.next_handle);
        self.next_handle += 1;
        handle
    }

    /// The document's path resolver
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Mutable access to the path resolver
    pub fn resolver_mut(&mut self) -> &mut PathResolver {
        &mut self.resolver
    }

    // ==================== Layouts ====================

    /// Add a paper-space layout
    pub fn add_layout(&mut self, name: impl Into<String>) -> Result<Handle> {
        let mut layout = Layout::new(name);
        let key = layout.name.to_uppercase();
        if self.layouts.contains_key(&key) {
            return Err(GuardError::DuplicateName(layout.name));
        }
        layout.handle = self.allocate_handle();
        let handle = layout.handle;
        self.layouts.insert(key, layout);
        Ok(handle)
    }

    /// Get a layout by name (case-insensitive)
    pub fn layout(&self, name: &str) -> Option<&Layout> {
        self.layouts.get(&name.to_uppercase())
    }

    /// Iterate over all layouts in insertion order
    pub fn layouts(&self) -> impl Iterator<Item = &Layout> {
        self.layouts.values()
    }

    /// Iterate over paper-space layouts only
    pub fn paper_layouts(&self) -> impl Iterator<Item = &Layout> {
        self.layouts.values().filter(|l| l.is_paper())
    }

    /// Name of the currently active layout
    pub fn active_layout(&self) -> &str {
        &self.active_layout
    }

    /// Switch the active layout
    pub fn set_active_layout(&mut self, name: &str) -> Result<()> {
        let layout = self
            .layout(name)
            .ok_or_else(|| GuardError::LayoutNotFound(name.to_string()))?;
        self.active_layout = layout.name.clone();
        Ok(())
    }

    // ==================== Layers ====================

    /// Add a layer
    pub fn add_layer(&mut self, name: impl Into<String>) -> Result<Handle> {
        let mut layer = Layer::new(name);
        let key = layer.name.to_uppercase();
        if self.layers.contains_key(&key) {
            return Err(GuardError::DuplicateName(layer.name));
        }
        layer.handle = self.allocate_handle();
        let handle = layer.handle;
        self.layers.insert(key, layer);
        Ok(handle)
    }

    /// Get a layer by name (case-insensitive)
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.get(&name.to_uppercase())
    }

    /// Check if a layer is locked; unknown layers count as unlocked
    pub fn is_layer_locked(&self, name: &str) -> bool {
        self.layer(name).map(|l| l.is_locked()).unwrap_or(false)
    }

    /// Lock a layer
    pub fn lock_layer(&mut self, name: &str) -> Result<()> {
        self.layers
            .get_mut(&name.to_uppercase())
            .map(Layer::lock)
            .ok_or_else(|| GuardError::LayerNotFound(name.to_string()))
    }

    /// Unlock a layer
    pub fn unlock_layer(&mut self, name: &str) -> Result<()> {
        self.layers
            .get_mut(&name.to_uppercase())
            .map(Layer::unlock)
            .ok_or_else(|| GuardError::LayerNotFound(name.to_string()))
    }

    // ==================== External references ====================

    /// Attach an external reference definition.
    ///
    /// Allocates a fresh handle: attaching is one of the operations that
    /// reissues identities, which is why protection state re-derives the
    /// handle from the fingerprint instead of trusting a stored one.
    pub fn attach_xref(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
        kind: XrefKind,
    ) -> Result<Handle> {
        let mut def = XrefDefinition::new(name, path, kind);
        let key = def.name.to_uppercase();
        if self.xrefs.contains_key(&key) || self.local_blocks.contains_key(&key) {
            return Err(GuardError::DuplicateName(def.name));
        }

        def.handle = self.allocate_handle();
        match self.resolver.resolve(&def.path) {
            Some(resolved) => {
                def.status = XrefStatus::Resolved;
                def.resolved_path = Some(resolved);
            }
            None => def.status = XrefStatus::Unresolved,
        }

        debug!(
            name = %def.name,
            path = %def.path,
            handle = %def.handle,
            resolved = def.is_resolved(),
            "attached external reference"
        );
        let handle = def.handle;
        self.xrefs.insert(key, def);
        Ok(handle)
    }

    /// Get an external reference definition by name (case-insensitive)
    pub fn xref(&self, name: &str) -> Option<&XrefDefinition> {
        self.xrefs.get(&name.to_uppercase())
    }

    /// Get an external reference definition by handle
    pub fn xref_by_handle(&self, handle: Handle) -> Option<&XrefDefinition> {
        self.xrefs.values().find(|d| d.handle == handle)
    }

    /// Iterate over all external reference definitions in insertion order
    pub fn xrefs(&self) -> impl Iterator<Item = &XrefDefinition> {
        self.xrefs.values()
    }

    /// Number of external reference definitions
    pub fn xref_count(&self) -> usize {
        self.xrefs.len()
    }

    /// Attempt to re-resolve a definition against the resolver.
    pub fn reload_xref(&mut self, handle: Handle) -> Result<()> {
        let def = self
            .xrefs
            .values_mut()
            .find(|d| d.handle == handle)
            .ok_or(GuardError::ObjectNotFound(handle))?;

        match self.resolver.resolve(&def.path) {
            Some(resolved) => {
                def.status = XrefStatus::Resolved;
                def.resolved_path = Some(resolved);
            }
            None => {
                def.status = XrefStatus::FileNotFound;
                def.resolved_path = None;
            }
        }
        debug!(name = %def.name, resolved = def.is_resolved(), "reloaded external reference");
        Ok(())
    }

    /// Detach a definition, erasing its dependent block references.
    pub fn detach_xref(&mut self, handle: Handle) -> Result<XrefDefinition> {
        let key = self
            .xrefs
            .iter()
            .find(|(_, d)| d.handle == handle)
            .map(|(k, _)| k.clone())
            .ok_or(GuardError::ObjectNotFound(handle))?;

        for ref_handle in self.references_of(handle) {
            self.remove_entity(ref_handle);
        }
        // IndexMap::shift_remove keeps the remaining definition order stable
        let def = self.xrefs.shift_remove(&key).expect("key just found");
        debug!(name = %def.name, handle = %handle, "detached external reference");
        Ok(def)
    }

    /// Bind a batch of definitions, merging each into the document as a
    /// local block.
    ///
    /// Mirrors host behavior: overlays, unresolved or non-drawing
    /// definitions, and definitions with no live references are silently
    /// skipped, never errors. Returns the handles actually bound.
    pub fn bind_xrefs(&mut self, handles: &[Handle]) -> Vec<Handle> {
        let mut bound = Vec::new();
        for &handle in handles {
            let Some((key, def)) = self.xrefs.iter().find(|(_, d)| d.handle == handle) else {
                continue;
            };
            if def.is_overlay() || !def.is_resolved() || !def.is_drawing_format() {
                debug!(name = %def.name, "bind skipped definition");
                continue;
            }
            if self.references_of(handle).is_empty() {
                debug!(name = %def.name, "bind skipped unreferenced definition");
                continue;
            }
            let key = key.clone();
            let def = self.xrefs.shift_remove(&key).expect("key just found");
            debug!(name = %def.name, handle = %handle, "bound external reference");
            self.local_blocks.insert(key, def.handle);
            bound.push(handle);
        }
        bound
    }

    /// Check whether a name is taken by any definition, external or local
    pub fn has_block_name(&self, name: &str) -> bool {
        let key = name.to_uppercase();
        self.xrefs.contains_key(&key) || self.local_blocks.contains_key(&key)
    }

    /// Check whether a bound (local) block with this name exists
    pub fn is_local_block(&self, name: &str) -> bool {
        self.local_blocks.contains_key(&name.to_uppercase())
    }

    /// Generate a block name not yet present in the document
    pub fn unique_block_name(&self, stem: &str) -> String {
        if !self.has_block_name(stem) {
            return stem.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", stem, n);
            if !self.has_block_name(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    // ==================== Entities ====================

    /// Add an entity to a layout
    pub fn add_entity(&mut self, layout_name: &str, mut entity: Entity) -> Result<Handle> {
        let key = layout_name.to_uppercase();
        if !self.layouts.contains_key(&key) {
            return Err(GuardError::LayoutNotFound(layout_name.to_string()));
        }
        let handle = self.allocate_handle();
        entity.set_handle(handle);
        self.entities.insert(handle, entity);
        self.layouts
            .get_mut(&key)
            .expect("layout just checked")
            .entities
            .push(handle);
        Ok(handle)
    }

    /// Get an entity by handle
    pub fn entity(&self, handle: Handle) -> Option<&Entity> {
        self.entities.get(&handle)
    }

    /// Iterate over all entities
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Erase an entity, removing it from its layout
    pub fn erase_entity(&mut self, handle: Handle) -> Result<Entity> {
        self.remove_entity(handle)
            .ok_or(GuardError::ObjectNotFound(handle))
    }

    fn remove_entity(&mut self, handle: Handle) -> Option<Entity> {
        let entity = self.entities.remove(&handle)?;
        for layout in self.layouts.values_mut() {
            layout.entities.retain(|&h| h != handle);
        }
        Some(entity)
    }

    /// Name of the layout holding an entity
    pub fn layout_of(&self, handle: Handle) -> Option<&str> {
        self.layouts
            .values()
            .find(|l| l.entities.contains(&handle))
            .map(|l| l.name.as_str())
    }

    /// Handles of every block reference pointing at a definition
    pub fn references_of(&self, definition: Handle) -> Vec<Handle> {
        let mut refs: Vec<Handle> = self
            .entities
            .values()
            .filter_map(Entity::as_block_reference)
            .filter(|r| r.definition == definition)
            .map(|r| r.handle)
            .collect();
        refs.sort();
        refs
    }

    /// Names of the paper-space layouts holding references to a definition
    pub fn paper_layouts_referencing(&self, definition: Handle) -> Vec<&str> {
        self.paper_layouts()
            .filter(|l| {
                l.entities.iter().any(|h| {
                    self.entities
                        .get(h)
                        .and_then(Entity::as_block_reference)
                        .map(|r| r.definition == definition)
                        .unwrap_or(false)
                })
            })
            .map(|l| l.name.as_str())
            .collect()
    }

    /// Point a block reference at a different definition.
    ///
    /// Fails when the reference sits on a locked layer; callers must unlock
    /// first and restore the lock after.
    pub fn retarget_block_reference(&mut self, reference: Handle, new_definition: Handle) -> Result<()> {
        let entity = self
            .entities
            .get(&reference)
            .ok_or(GuardError::ObjectNotFound(reference))?;
        let layer = entity.layer().to_string();
        if self.is_layer_locked(&layer) {
            return Err(GuardError::LayerLocked(layer));
        }
        let block_ref = self
            .entities
            .get_mut(&reference)
            .and_then(Entity::as_block_reference_mut)
            .ok_or(GuardError::ObjectNotFound(reference))?;
        block_ref.definition = new_definition;
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vector3;

    fn doc_with_file(file: &str) -> Document {
        let mut doc = Document::with_base_dir("C:/proj");
        doc.resolver_mut().register_file(file);
        doc
    }

    #[test]
    fn test_new_document_defaults() {
        let doc = Document::new();
        assert_eq!(doc.active_layout(), "Model");
        assert!(doc.layout("model").is_some());
        assert!(doc.layer("0").is_some());
        assert_eq!(doc.xref_count(), 0);
    }

    #[test]
    fn test_attach_resolves_against_base_dir() {
        let mut doc = doc_with_file("C:/proj/xrefs/x-tb.dwg");
        let h = doc.attach_xref("x-tb", "xrefs/x-tb.dwg", XrefKind::Attached).unwrap();
        let def = doc.xref_by_handle(h).unwrap();
        assert!(def.is_resolved());
        assert_eq!(def.resolved_path.as_deref(), Some("c:/proj/xrefs/x-tb.dwg"));
    }

    #[test]
    fn test_attach_duplicate_name() {
        let mut doc = Document::new();
        doc.attach_xref("x-tb", "x-tb.dwg", XrefKind::Attached).unwrap();
        let err = doc.attach_xref("X-TB", "other.dwg", XrefKind::Attached);
        assert!(matches!(err, Err(GuardError::DuplicateName(_))));
    }

    #[test]
    fn test_detach_removes_references() {
        let mut doc = doc_with_file("C:/proj/x-tb.dwg");
        doc.add_layout("A-101").unwrap();
        let def = doc.attach_xref("x-tb", "x-tb.dwg", XrefKind::Attached).unwrap();
        let r = doc
            .add_entity(
                "A-101",
                Entity::BlockReference(BlockReference::new(def, Vector3::ZERO)),
            )
            .unwrap();

        doc.detach_xref(def).unwrap();
        assert!(doc.xref_by_handle(def).is_none());
        assert!(doc.entity(r).is_none());
        assert_eq!(doc.layout("A-101").unwrap().entity_count(), 0);
    }

    #[test]
    fn test_bind_skips_overlay_and_unreferenced() {
        let mut doc = doc_with_file("C:/proj/a.dwg");
        doc.resolver_mut().register_file("C:/proj/b.dwg");
        doc.add_layout("A-101").unwrap();

        let overlay = doc.attach_xref("a", "a.dwg", XrefKind::Overlay).unwrap();
        let unreferenced = doc.attach_xref("b", "b.dwg", XrefKind::Attached).unwrap();
        doc.add_entity(
            "A-101",
            Entity::BlockReference(BlockReference::new(overlay, Vector3::ZERO)),
        )
        .unwrap();

        let bound = doc.bind_xrefs(&[overlay, unreferenced]);
        assert!(bound.is_empty());
        assert_eq!(doc.xref_count(), 2);
    }

    #[test]
    fn test_bind_merges_into_local_block() {
        let mut doc = doc_with_file("C:/proj/a.dwg");
        doc.add_layout("A-101").unwrap();
        let def = doc.attach_xref("a", "a.dwg", XrefKind::Attached).unwrap();
        doc.add_entity(
            "A-101",
            Entity::BlockReference(BlockReference::new(def, Vector3::ZERO)),
        )
        .unwrap();

        let bound = doc.bind_xrefs(&[def]);
        assert_eq!(bound, vec![def]);
        assert_eq!(doc.xref_count(), 0);
        assert!(doc.is_local_block("a"));
        // The reference survives the merge
        assert_eq!(doc.references_of(def).len(), 1);
    }

    #[test]
    fn test_retarget_respects_layer_lock() {
        let mut doc = doc_with_file("C:/proj/a.dwg");
        doc.add_layout("A-101").unwrap();
        doc.add_layer("TB").unwrap();
        let old = doc.attach_xref("a", "a.dwg", XrefKind::Overlay).unwrap();
        let new = doc.attach_xref("a_1", "a.dwg", XrefKind::Attached).unwrap();
        let r = doc
            .add_entity(
                "A-101",
                Entity::BlockReference(BlockReference::new(old, Vector3::ZERO).on_layer("TB")),
            )
            .unwrap();

        doc.lock_layer("TB").unwrap();
        assert!(matches!(
            doc.retarget_block_reference(r, new),
            Err(GuardError::LayerLocked(_))
        ));

        doc.unlock_layer("TB").unwrap();
        doc.retarget_block_reference(r, new).unwrap();
        assert_eq!(doc.references_of(new), vec![r]);
    }

    #[test]
    fn test_unique_block_name() {
        let mut doc = Document::new();
        assert_eq!(doc.unique_block_name("x-tb"), "x-tb");
        doc.attach_xref("x-tb", "x-tb.dwg", XrefKind::Attached).unwrap();
        assert_eq!(doc.unique_block_name("x-tb"), "x-tb_1");
    }

    #[test]
    fn test_reload_marks_missing_file() {
        let mut doc = Document::with_base_dir("C:/proj");
        let h = doc.attach_xref("gone", "gone.dwg", XrefKind::Attached).unwrap();
        doc.reload_xref(h).unwrap();
        let def = doc.xref_by_handle(h).unwrap();
        assert_eq!(def.status, XrefStatus::FileNotFound);
    }
}
