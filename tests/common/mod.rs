//! Test document builders shared by the integration tests.

#![allow(dead_code)]

use xrefguard::types::Handle;
use xrefguard::{BlockReference, Document, Entity, Vector3, XrefKind};

/// Base directory every builder document resolves against.
pub const BASE_DIR: &str = "C:/proj";

/// Create an empty project document with one paper-space sheet.
pub fn sheet_document(sheet: &str) -> Document {
    let mut doc = Document::with_base_dir(BASE_DIR);
    doc.add_layout(sheet).unwrap();
    doc
}

/// Register a file under the project directory and return its project path.
pub fn with_file(doc: &mut Document, rel_path: &str) -> String {
    let full = format!("{}/{}", BASE_DIR, rel_path);
    doc.resolver_mut().register_file(&full);
    rel_path.to_string()
}

/// Attach a reference and insert one block reference for it on a layout.
pub fn attach_with_ref(
    doc: &mut Document,
    layout: &str,
    name: &str,
    rel_path: &str,
    kind: XrefKind,
    at: Vector3,
) -> (Handle, Handle) {
    let path = with_file(doc, rel_path);
    let def = doc.attach_xref(name, path, kind).unwrap();
    let reference = doc
        .add_entity(layout, Entity::BlockReference(BlockReference::new(def, at)))
        .unwrap();
    (def, reference)
}

/// The canonical happy-path document: one sheet with a title block named
/// `x-tb` at the origin, plus ordinary grid and site references.
pub fn typical_sheet_set() -> (Document, Handle, Vec<Handle>) {
    let mut doc = sheet_document("A-101");
    doc.add_layout("A-102").unwrap();

    let (tb, _) = attach_with_ref(
        &mut doc,
        "A-101",
        "x-tb",
        "xrefs/x-tb.dwg",
        XrefKind::Attached,
        Vector3::ZERO,
    );
    let (grid, _) = attach_with_ref(
        &mut doc,
        "A-101",
        "grid",
        "refs/grid.dwg",
        XrefKind::Attached,
        Vector3::new(300.0, 120.0, 0.0),
    );
    let (site, _) = attach_with_ref(
        &mut doc,
        "A-102",
        "site-plan",
        "refs/site-plan.dwg",
        XrefKind::Attached,
        Vector3::new(80.0, 40.0, 0.0),
    );

    (doc, tb, vec![grid, site])
}
