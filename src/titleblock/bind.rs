//! The bind/promotion pass.
//!
//! Drives the protected title block through validation, optional
//! overlay-to-attached promotion, and binding, re-validating against the
//! fingerprint at every step. Any integrity violation on the protected
//! item aborts the pass and raises the session's sticky veto; failures on
//! non-protected items are logged and skipped.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::document::path::file_stem;
use crate::document::{Document, XrefKind};
use crate::error::{GuardError, Result};
use crate::titleblock::session::ProtectionSession;
use crate::types::Handle;

/// Number of extra promotion attempts after a bind leaves the protected
/// reference external. The host silently no-ops a bind on certain overlay
/// states; one blind retry recovers most of these without looping.
pub const PROMOTION_RETRIES: usize = 1;

/// Why the pass aborted.
#[derive(Debug, Clone, Error)]
pub enum BindFailure {
    /// The protected definition is no longer present in the document.
    #[error("protected reference '{name}' is missing from the document")]
    Missing { name: String },

    /// The protected reference does not point at a drawing file.
    #[error("protected reference '{name}' is not a drawing file (raw: {raw_path}, resolved: {resolved_path})")]
    NotDrawing {
        name: String,
        raw_path: String,
        resolved_path: String,
    },

    /// The protected reference stayed unresolved after one reload.
    #[error("protected reference '{name}' is unresolved after reload (raw: {raw_path})")]
    UnresolvedAfterReload { name: String, raw_path: String },

    /// Overlay-to-attached promotion failed.
    #[error("promotion of protected reference '{name}' failed: {reason}")]
    PromotionFailed { name: String, reason: String },

    /// The protected reference was still external after bind and retry.
    #[error("protected reference '{name}' is still external after bind and retry")]
    StillExternalAfterBind { name: String },
}

/// Outcome of one bind/promotion pass.
#[derive(Debug, Clone)]
pub enum BindOutcome {
    /// The protected reference (if any) is now internal to the document.
    Verified,
    /// The pass aborted; the downstream destructive stage is vetoed.
    Aborted(BindFailure),
}

impl BindOutcome {
    /// True when the pass completed without an abort.
    pub fn is_verified(&self) -> bool {
        matches!(self, BindOutcome::Verified)
    }
}

/// Run one finalize pass over the document.
///
/// With an idle session this simply binds every bindable external
/// reference. With an active session the protected reference is located
/// through its fingerprint, validated, promoted when it is an overlay,
/// bound, and re-checked; any violation aborts the pass and sets the
/// session's sticky veto.
pub fn run_bind_promotion_pass(doc: &mut Document, session: &mut ProtectionSession) -> BindOutcome {
    if session.is_active() {
        match prepare_protected(doc, session) {
            Ok(()) => {}
            Err(failure) => return abort(session, failure),
        }
    }

    bind_all(doc);

    if !session.is_active() {
        return BindOutcome::Verified;
    }

    // Re-check: the protected definition must have left the external
    // reference table. A silent no-op bind gets one promotion retry.
    for attempt in 0..=PROMOTION_RETRIES {
        let current = session.current_definition();
        if doc.xref_by_handle(current).is_none() {
            info!(handle = %current, "protected reference verified internal");
            return BindOutcome::Verified;
        }
        if attempt == PROMOTION_RETRIES {
            break;
        }
        debug!(handle = %current, "protected reference still external, retrying promotion");
        if let Err(reason) = promote(doc, session, current) {
            let name = protected_name(session);
            return abort(
                session,
                BindFailure::PromotionFailed {
                    name,
                    reason: reason.to_string(),
                },
            );
        }
        bind_all(doc);
    }

    let name = protected_name(session);
    abort(session, BindFailure::StillExternalAfterBind { name })
}

/// Steps 1-3: locate, validate, reload once, promote overlays.
fn prepare_protected(doc: &mut Document, session: &mut ProtectionSession) -> std::result::Result<(), BindFailure> {
    let Some(def_handle) = locate_protected(doc, session) else {
        return Err(BindFailure::Missing {
            name: protected_name(session),
        });
    };

    let def = doc.xref_by_handle(def_handle).expect("handle just located");
    let name = def.name.clone();
    let raw_path = def.path.clone();
    session.update_identity(def_handle, &def.name, def.effective_path());

    if !def.is_drawing_format() {
        return Err(BindFailure::NotDrawing {
            name,
            raw_path,
            resolved_path: def.effective_path().to_string(),
        });
    }

    if !def.is_resolved() {
        // Exactly one reload attempt.
        if doc.reload_xref(def_handle).is_err()
            || !doc
                .xref_by_handle(def_handle)
                .map(|d| d.is_resolved())
                .unwrap_or(false)
        {
            return Err(BindFailure::UnresolvedAfterReload { name, raw_path });
        }
    }

    let is_overlay = doc
        .xref_by_handle(def_handle)
        .map(|d| d.is_overlay())
        .unwrap_or(false);
    if is_overlay {
        promote(doc, session, def_handle).map_err(|reason| BindFailure::PromotionFailed {
            name,
            reason: reason.to_string(),
        })?;
    }

    Ok(())
}

/// Locate the protected definition, treating the stored handle as a cache
/// that the fingerprint can rebuild.
fn locate_protected(doc: &Document, session: &ProtectionSession) -> Option<Handle> {
    let current = session.current_definition();
    if let Some(def) = doc.xref_by_handle(current) {
        if session.fingerprint_matches(&def.name, def.effective_path(), Some(doc.resolver())) {
            return Some(current);
        }
    }
    // Identity churned; re-derive through the fingerprint.
    doc.xrefs()
        .find(|def| session.fingerprint_matches(&def.name, def.effective_path(), Some(doc.resolver())))
        .map(|def| def.handle)
}

/// Promote a definition to a fresh attached reference.
///
/// Re-attaches the same resolved source under a freshly generated unique
/// name, retargets every reference (unlocking locked layers for the
/// duration), detaches the old definition, and re-keys the session.
fn promote(doc: &mut Document, session: &mut ProtectionSession, old_handle: Handle) -> Result<Handle> {
    let old = doc
        .xref_by_handle(old_handle)
        .ok_or(GuardError::ObjectNotFound(old_handle))?;
    let source_path = old.effective_path().to_string();
    let old_name = old.name.clone();

    let new_name = doc.unique_block_name(file_stem(&source_path));
    let new_handle = doc.attach_xref(&new_name, &source_path, XrefKind::Attached)?;
    doc.reload_xref(new_handle)?;

    let verified = doc
        .xref_by_handle(new_handle)
        .map(|d| d.is_attached() && d.is_resolved() && d.is_drawing_format())
        .unwrap_or(false);
    if !verified {
        // Leave the document as it was for the protected item.
        let _ = doc.detach_xref(new_handle);
        return Err(GuardError::AttachFailed {
            path: source_path,
            reason: "re-attached definition did not verify as attached+resolved drawing".to_string(),
        });
    }

    for reference in doc.references_of(old_handle) {
        let layer = doc
            .entity(reference)
            .map(|e| e.layer().to_string())
            .unwrap_or_default();
        let was_locked = doc.is_layer_locked(&layer);
        if was_locked {
            doc.unlock_layer(&layer)?;
        }
        let retargeted = doc.retarget_block_reference(reference, new_handle);
        if was_locked {
            doc.lock_layer(&layer)?;
        }
        retargeted?;
    }

    doc.detach_xref(old_handle)?;
    session.update_identity(new_handle, &new_name, &source_path);
    info!(old = %old_name, new = %new_name, "promoted overlay to attached reference");
    Ok(new_handle)
}

/// Step 4: bind every bindable external reference in one batch.
fn bind_all(doc: &mut Document) {
    let targets: Vec<Handle> = doc
        .xrefs()
        .filter(|d| d.is_drawing_format())
        .map(|d| d.handle)
        .collect();
    let bound = doc.bind_xrefs(&targets);
    info!(requested = targets.len(), bound = bound.len(), "bound external references");
}

fn protected_name(session: &ProtectionSession) -> String {
    session
        .fingerprint()
        .map(|fp| fp.canonical_name.clone())
        .unwrap_or_default()
}

fn abort(session: &mut ProtectionSession, failure: BindFailure) -> BindOutcome {
    let (raw, resolved) = session
        .fingerprint()
        .map(|fp| (fp.raw_path.clone(), fp.file_name_token.clone()))
        .unwrap_or_default();
    warn!(
        reason = %failure,
        raw_path = %raw,
        file_token = %resolved,
        "bind/promotion pass aborted; downstream detach vetoed"
    );
    session.mark_bind_failed();
    BindOutcome::Aborted(failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BlockReference, Entity};
    use crate::types::Vector3;

    fn sheet_doc() -> Document {
        let mut doc = Document::with_base_dir("C:/proj");
        doc.resolver_mut().register_file("C:/proj/xrefs/x-tb.dwg");
        doc.add_layout("A-101").unwrap();
        doc
    }

    fn insert_ref(doc: &mut Document, def: Handle) -> Handle {
        doc.add_entity(
            "A-101",
            Entity::BlockReference(BlockReference::new(def, Vector3::ZERO)),
        )
        .unwrap()
    }

    #[test]
    fn test_idle_session_binds_everything() {
        let mut doc = sheet_doc();
        let def = doc
            .attach_xref("x-tb", "xrefs/x-tb.dwg", XrefKind::Attached)
            .unwrap();
        insert_ref(&mut doc, def);

        let mut session = ProtectionSession::new();
        let outcome = run_bind_promotion_pass(&mut doc, &mut session);
        assert!(outcome.is_verified());
        assert_eq!(doc.xref_count(), 0);
        assert!(doc.is_local_block("x-tb"));
    }

    #[test]
    fn test_missing_protected_aborts() {
        let mut doc = sheet_doc();
        let mut session = ProtectionSession::new();
        session.enable_protection(Handle::new(0x99), "x-tb", "xrefs/x-tb.dwg", "A-101");

        let outcome = run_bind_promotion_pass(&mut doc, &mut session);
        assert!(matches!(outcome, BindOutcome::Aborted(BindFailure::Missing { .. })));
        assert!(session.abort_downstream_detach());
    }

    #[test]
    fn test_non_drawing_protected_aborts() {
        let mut doc = sheet_doc();
        doc.resolver_mut().register_file("C:/proj/x-tb.png");
        let def = doc.attach_xref("x-tb", "x-tb.png", XrefKind::Attached).unwrap();
        insert_ref(&mut doc, def);

        let mut session = ProtectionSession::new();
        session.enable_protection(def, "x-tb", "x-tb.png", "A-101");

        let outcome = run_bind_promotion_pass(&mut doc, &mut session);
        assert!(matches!(outcome, BindOutcome::Aborted(BindFailure::NotDrawing { .. })));
        assert!(session.bind_failed());
    }

    #[test]
    fn test_unresolved_after_reload_aborts() {
        let mut doc = Document::with_base_dir("C:/proj");
        doc.add_layout("A-101").unwrap();
        let def = doc
            .attach_xref("x-tb", "xrefs/x-tb.dwg", XrefKind::Attached)
            .unwrap();
        insert_ref(&mut doc, def);

        let mut session = ProtectionSession::new();
        session.enable_protection(def, "x-tb", "xrefs/x-tb.dwg", "A-101");

        let outcome = run_bind_promotion_pass(&mut doc, &mut session);
        assert!(matches!(
            outcome,
            BindOutcome::Aborted(BindFailure::UnresolvedAfterReload { .. })
        ));
    }

    #[test]
    fn test_reload_recovers_late_arriving_file() {
        let mut doc = Document::with_base_dir("C:/proj");
        doc.add_layout("A-101").unwrap();
        let def = doc
            .attach_xref("x-tb", "xrefs/x-tb.dwg", XrefKind::Attached)
            .unwrap();
        insert_ref(&mut doc, def);
        // File appears after attach but before the pass.
        doc.resolver_mut().register_file("C:/proj/xrefs/x-tb.dwg");

        let mut session = ProtectionSession::new();
        session.enable_protection(def, "x-tb", "xrefs/x-tb.dwg", "A-101");

        let outcome = run_bind_promotion_pass(&mut doc, &mut session);
        assert!(outcome.is_verified());
        assert!(!session.abort_downstream_detach());
    }

    #[test]
    fn test_overlay_is_promoted_and_bound() {
        let mut doc = sheet_doc();
        doc.add_layer("TB").unwrap();
        let def = doc
            .attach_xref("x-tb", "xrefs/x-tb.dwg", XrefKind::Overlay)
            .unwrap();
        let r = doc
            .add_entity(
                "A-101",
                Entity::BlockReference(BlockReference::new(def, Vector3::ZERO).on_layer("TB")),
            )
            .unwrap();
        doc.lock_layer("TB").unwrap();

        let mut session = ProtectionSession::new();
        session.enable_protection(def, "x-tb", "xrefs/x-tb.dwg", "A-101");

        let outcome = run_bind_promotion_pass(&mut doc, &mut session);
        assert!(outcome.is_verified());

        // Old overlay definition is gone, the promoted definition was
        // bound, and the reference follows the new identity.
        assert!(doc.xref_by_handle(def).is_none());
        assert_eq!(doc.xref_count(), 0);
        let new_def = doc.entity(r).unwrap().as_block_reference().unwrap().definition;
        assert_ne!(new_def, def);
        assert!(session.is_protected(new_def));
        // The lock dance restored the layer.
        assert!(doc.is_layer_locked("TB"));
    }

    #[test]
    fn test_unreferenced_protected_aborts_after_retry() {
        // A definition with no live references: the host no-ops its bind,
        // the retry promotes and re-binds, and the second no-op aborts.
        let mut doc = sheet_doc();
        let def = doc
            .attach_xref("x-tb", "xrefs/x-tb.dwg", XrefKind::Attached)
            .unwrap();

        let mut session = ProtectionSession::new();
        session.enable_protection(def, "x-tb", "xrefs/x-tb.dwg", "A-101");

        let outcome = run_bind_promotion_pass(&mut doc, &mut session);
        assert!(matches!(
            outcome,
            BindOutcome::Aborted(BindFailure::StillExternalAfterBind { .. })
        ));
        assert!(session.abort_downstream_detach());
    }

    #[test]
    fn test_identity_rederived_after_churn() {
        let mut doc = sheet_doc();
        let def = doc
            .attach_xref("x-tb", "xrefs/x-tb.dwg", XrefKind::Attached)
            .unwrap();
        insert_ref(&mut doc, def);

        let mut session = ProtectionSession::new();
        // Stale handle: protection was enabled before a mutation reissued
        // identities.
        session.enable_protection(Handle::new(0xDEAD), "x-tb", "xrefs/x-tb.dwg", "A-101");

        let outcome = run_bind_promotion_pass(&mut doc, &mut session);
        assert!(outcome.is_verified());
    }
}
