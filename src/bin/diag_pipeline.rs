/// Pipeline walkthrough diagnostic: builds a synthetic two-sheet document,
/// runs each stage, and prints what the resolver, bind pass and detach
/// gate decided at every step.
use anyhow::Result;
use tracing_subscriber::EnvFilter;

use xrefguard::titleblock::{bind, detach, resolver, selection};
use xrefguard::{
    BlockReference, DetachScope, Document, Entity, PdfUnderlay, ProtectionSession, RasterImage,
    Vector3, XrefKind,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut doc = build_document()?;
    println!(
        "1. Document: {} layouts, {} xref definitions, {} entities",
        doc.layouts().count(),
        doc.xref_count(),
        doc.entities().count()
    );

    let resolution = resolver::resolve(&doc);
    println!("2. Resolution: {:?}", resolution.kind);
    for c in &resolution.candidates {
        println!(
            "   {:>4}  {} on {} ({})",
            c.score, c.block_name, c.layout_name, c.path_name
        );
    }

    let mut session = ProtectionSession::new();
    session.reset();
    if let Some(pick) = selection::choose_title_block(&doc, &resolution, None) {
        println!(
            "3. Protecting '{}' from {} on layout {}",
            pick.block_name, pick.path_name, pick.layout_name
        );
        session.enable_protection(
            pick.definition,
            &pick.block_name,
            &pick.path_name,
            &pick.layout_name,
        );
    } else {
        println!("3. No title block confirmed; running unprotected");
    }

    let outcome = bind::run_bind_promotion_pass(&mut doc, &mut session);
    println!("4. Bind/promotion outcome: {:?}", outcome);

    let report = detach::run_protected_detach_gate(&mut doc, &mut session, DetachScope::everything());
    println!("5. Detach gate:");
    for entry in &report {
        println!("   {}", entry);
    }

    println!(
        "6. Remaining: {} xref definitions, {} entities",
        doc.xref_count(),
        doc.entities().count()
    );
    Ok(())
}

fn build_document() -> Result<Document> {
    let mut doc = Document::with_base_dir("C:/proj");
    doc.resolver_mut().register_file("C:/proj/xrefs/x-tb.dwg");
    doc.resolver_mut().register_file("C:/proj/refs/grid.dwg");
    doc.resolver_mut().register_file("C:/proj/refs/site-plan.dwg");

    doc.add_layout("A-101")?;
    doc.add_layout("A-102")?;
    doc.add_layer("TB-FRAME")?;

    // The title block: an overlay, so the bind pass must promote it.
    let tb = doc.attach_xref("x-tb", "xrefs/x-tb.dwg", XrefKind::Overlay)?;
    doc.add_entity(
        "A-101",
        Entity::BlockReference(BlockReference::new(tb, Vector3::ZERO).on_layer("TB-FRAME")),
    )?;

    // Ordinary references that should be bound and detached.
    let grid = doc.attach_xref("grid", "refs/grid.dwg", XrefKind::Attached)?;
    doc.add_entity(
        "A-101",
        Entity::BlockReference(BlockReference::new(grid, Vector3::new(250.0, 40.0, 0.0))),
    )?;
    let site = doc.attach_xref("site-plan", "refs/site-plan.dwg", XrefKind::Attached)?;
    doc.add_entity(
        "A-102",
        Entity::BlockReference(BlockReference::new(site, Vector3::new(10.0, 10.0, 0.0))),
    )?;

    // Leftovers from the embedding pipeline.
    doc.add_entity(
        "A-102",
        Entity::RasterImage(RasterImage::new("scans/survey.png", Vector3::ZERO)),
    )?;
    doc.add_entity(
        "A-102",
        Entity::PdfUnderlay(PdfUnderlay::new("specs/detail.pdf", "2")),
    )?;

    Ok(doc)
}
