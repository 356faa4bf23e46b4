//! Title-block identification and protection.
//!
//! The cleanup pipeline collapses a sheet's external references into local
//! geometry. Exactly one reference, the title block carrying the sheet
//! border, must survive that destruction, and the stages that destroy
//! things run as independently queued commands whose mutations keep
//! reissuing the reference's identity. This module stack solves that:
//!
//! - [`candidate`] scans paper-space layouts for observations
//! - [`scoring`] ranks them with an additive heuristic weight table
//! - [`resolver`] classifies the ranking as resolved/ambiguous/not-found
//! - [`selection`] drives the manual fallback for ambiguous outcomes
//! - [`session`] holds the cross-stage protection state and sticky veto
//! - [`fingerprint`] re-identifies the reference after identity churn
//! - [`bind`] validates, promotes and binds the protected reference
//! - [`detach`] erases everything else, honoring the veto

pub mod bind;
pub mod candidate;
pub mod detach;
pub mod fingerprint;
pub mod resolver;
pub mod scoring;
pub mod selection;
pub mod session;

pub use bind::{run_bind_promotion_pass, BindFailure, BindOutcome};
pub use candidate::{collect_candidates, XrefCandidate};
pub use detach::{run_protected_detach_gate, DetachScope};
pub use fingerprint::ProtectionFingerprint;
pub use resolver::{likely_candidates, resolve, ResolutionKind, ResolutionResult};
pub use selection::{
    choose_title_block, ManualPick, SelectionOutcome, SelectionProvider,
};
pub use session::ProtectionSession;

use crate::document::Document;
use crate::report::CleanupReport;

/// Run the whole pipeline against a document.
///
/// In the host the stages are queued as separate commands; this driver
/// chains them directly for embedded and test use, with the same ordering
/// guarantees: reset, resolve/confirm, bind/promote, gated detach. The
/// session is reset at the start and again by the gate at the end.
pub fn run_pipeline(
    doc: &mut Document,
    session: &mut ProtectionSession,
    provider: Option<&mut dyn SelectionProvider>,
    scope: DetachScope,
) -> CleanupReport {
    session.reset();

    let resolution = resolver::resolve(doc);
    if let Some(pick) = selection::choose_title_block(doc, &resolution, provider) {
        session.enable_protection(
            pick.definition,
            &pick.block_name,
            &pick.path_name,
            &pick.layout_name,
        );
    }

    let _outcome = bind::run_bind_promotion_pass(doc, session);
    detach::run_protected_detach_gate(doc, session, scope)
}
