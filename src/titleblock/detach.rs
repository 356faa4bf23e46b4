//! The protected-detach gate.
//!
//! Runs immediately before the stage that erases the remaining external
//! references after finalize. Honors the session's sticky veto, builds the
//! protected-id set, destroys everything else in scope, and always resets
//! the session on the way out.

use ahash::AHashSet;
use bitflags::bitflags;
use tracing::{info, warn};

use crate::document::{Document, Entity};
use crate::report::{CleanupReport, ReportKind};
use crate::titleblock::resolver;
use crate::titleblock::session::ProtectionSession;
use crate::types::Handle;

bitflags! {
    /// What the detach stage is allowed to destroy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DetachScope: u32 {
        /// External reference definitions and their block references
        const XREFS = 0b001;
        /// Raster image entities
        const RASTER_IMAGES = 0b010;
        /// PDF underlay entities
        const PDF_UNDERLAYS = 0b100;
    }
}

impl DetachScope {
    /// The full cleanup scope.
    pub fn everything() -> Self {
        Self::all()
    }
}

/// Erase the remaining external references, sparing the protected set.
///
/// Contract: when the session's veto is up, zero destructive operations
/// are performed. Per-item failures on non-protected references are logged
/// and skipped; they never abort the run. The session is reset before
/// returning, success or abort.
pub fn run_protected_detach_gate(
    doc: &mut Document,
    session: &mut ProtectionSession,
    scope: DetachScope,
) -> CleanupReport {
    let mut report = CleanupReport::new();

    if session.abort_downstream_detach() {
        let why = if session.bind_failed() {
            "bind failure"
        } else {
            "explicit abort"
        };
        let what = session
            .fingerprint()
            .map(|fp| format!("'{}' ({})", fp.canonical_name, fp.raw_path))
            .unwrap_or_else(|| "<no fingerprint>".to_string());
        warn!(reason = why, protected = %what, "detach stage vetoed, nothing destroyed");
        report.record(
            ReportKind::Aborted,
            format!("detach stage vetoed ({}) while protecting {}", why, what),
        );
        session.reset();
        return report;
    }

    let protected = protected_ids(doc, session);

    if scope.contains(DetachScope::XREFS) {
        let defs: Vec<Handle> = doc.xrefs().map(|d| d.handle).collect();
        for handle in defs {
            let (name, path) = match doc.xref_by_handle(handle) {
                Some(def) => (def.name.clone(), def.effective_path().to_string()),
                None => continue,
            };
            if protected.contains(&handle) {
                info!(name = %name, "preserved protected reference");
                report.record(ReportKind::Preserved, format!("{} ({})", name, path));
                continue;
            }
            match doc.detach_xref(handle) {
                Ok(_) => report.record(ReportKind::Detached, format!("{} ({})", name, path)),
                Err(err) => {
                    warn!(name = %name, path = %path, error = %err, "detach failed, skipping");
                    report.record(
                        ReportKind::Skipped,
                        format!("{} ({}): {}", name, path, err),
                    );
                }
            }
        }
    }

    if scope.contains(DetachScope::RASTER_IMAGES) {
        erase_file_entities(doc, &mut report, |e| matches!(e, Entity::RasterImage(_)));
    }
    if scope.contains(DetachScope::PDF_UNDERLAYS) {
        erase_file_entities(doc, &mut report, |e| matches!(e, Entity::PdfUnderlay(_)));
    }

    session.reset();
    report
}

/// The protected-id set: the session's current identity, the fresh likely
/// set, and every definition whose name/path fingerprint-matches the
/// session and is referenced from a matching paper-space layout.
fn protected_ids(doc: &Document, session: &ProtectionSession) -> AHashSet<Handle> {
    if !session.is_active() {
        return AHashSet::new();
    }

    let mut protected = resolver::likely_candidates(doc);

    let current = session.current_definition();
    if current.is_valid() {
        protected.insert(current);
    }

    let recorded_layout = session
        .fingerprint()
        .map(|fp| fp.layout_name.clone())
        .unwrap_or_default();
    for def in doc.xrefs() {
        if protected.contains(&def.handle) {
            continue;
        }
        if !session.fingerprint_matches(&def.name, def.effective_path(), Some(doc.resolver())) {
            continue;
        }
        let layouts = doc.paper_layouts_referencing(def.handle);
        let layout_ok = !layouts.is_empty()
            && (recorded_layout.is_empty()
                || layouts
                    .iter()
                    .any(|l| l.eq_ignore_ascii_case(&recorded_layout)));
        if layout_ok {
            protected.insert(def.handle);
        }
    }

    protected
}

fn erase_file_entities<F>(doc: &mut Document, report: &mut CleanupReport, mut select: F)
where
    F: FnMut(&Entity) -> bool,
{
    let handles: Vec<Handle> = doc
        .entities()
        .filter(|e| select(e))
        .map(Entity::handle)
        .collect();
    for handle in handles {
        match doc.erase_entity(handle) {
            Ok(entity) => report.record(
                ReportKind::Erased,
                format!("{} {}", entity.entity_type(), handle),
            ),
            Err(err) => report.record(ReportKind::Skipped, format!("{}: {}", handle, err)),
        }
    }
}
