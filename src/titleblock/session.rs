//! The protection session.
//!
//! One session instance lives across the whole cleanup run. The pipeline's
//! stages are queued independently and share no call stack, so this struct
//! is the single source of truth for "is there a protected item, and is it
//! currently safe to destroy things". It is owned by the pipeline driver
//! and passed by reference into every stage.

use tracing::debug;

use crate::document::PathResolver;
use crate::titleblock::fingerprint::ProtectionFingerprint;
use crate::types::Handle;

/// Process-wide protection state for one cleanup run.
///
/// Invariants: `abort_downstream_detach` is true iff `bind_failed` is true
/// or an explicit abort was requested; `current_definition` is only
/// meaningful while `active`. The abort flag is sticky: once set it
/// survives until [`reset`], so a later stage cannot mistakenly undo an
/// abort.
///
/// [`reset`]: ProtectionSession::reset
#[derive(Debug, Clone, Default)]
pub struct ProtectionSession {
    active: bool,
    fingerprint: Option<ProtectionFingerprint>,
    current_definition: Handle,
    bind_failed: bool,
    explicit_abort: bool,
}

impl ProtectionSession {
    /// Create an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the session back to idle, clearing all fields.
    ///
    /// Always safe to call. Must be called once at the top of every
    /// independent cleanup run and once after the run's final destructive
    /// stage completes.
    pub fn reset(&mut self) {
        if self.active {
            debug!("protection session reset");
        }
        *self = Self::default();
    }

    /// Enable protection for a confirmed title block.
    ///
    /// Computes and stores the fingerprint, records the current identity,
    /// and clears any failure state from a previous run.
    pub fn enable_protection(
        &mut self,
        definition: Handle,
        block_name: &str,
        path_name: &str,
        layout_name: &str,
    ) {
        self.active = true;
        self.fingerprint = Some(ProtectionFingerprint::new(
            block_name,
            path_name,
            layout_name,
        ));
        self.current_definition = definition;
        self.bind_failed = false;
        self.explicit_abort = false;
        debug!(
            name = %block_name,
            path = %path_name,
            layout = %layout_name,
            handle = %definition,
            "protection enabled"
        );
    }

    /// Whether a title block is currently protected.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The stored fingerprint, when protection is active.
    pub fn fingerprint(&self) -> Option<&ProtectionFingerprint> {
        self.fingerprint.as_ref()
    }

    /// The protected reference's current identity.
    ///
    /// Valid only while active, and only until the next mutating
    /// operation; stages re-derive it through the fingerprint.
    pub fn current_definition(&self) -> Handle {
        self.current_definition
    }

    /// Re-key the session after promotion or rebind changed the protected
    /// reference's identity.
    ///
    /// The recorded layout survives: the reference did not move, only its
    /// name and handle changed.
    pub fn update_identity(&mut self, definition: Handle, block_name: &str, path_name: &str) {
        let layout = self
            .fingerprint
            .as_ref()
            .map(|fp| fp.layout_name.clone())
            .unwrap_or_default();
        self.fingerprint = Some(ProtectionFingerprint::new(block_name, path_name, &layout));
        self.current_definition = definition;
        debug!(name = %block_name, handle = %definition, "protected identity updated");
    }

    /// Check a definition handle against the current identity.
    pub fn is_protected(&self, definition: Handle) -> bool {
        self.active && definition.is_valid() && definition == self.current_definition
    }

    /// Check a name/path pair against the stored fingerprint.
    pub fn fingerprint_matches(
        &self,
        name: &str,
        path_name: &str,
        resolver: Option<&PathResolver>,
    ) -> bool {
        match (&self.fingerprint, self.active) {
            (Some(fp), true) => fp.matches(name, path_name, resolver),
            _ => false,
        }
    }

    /// Record a bind failure. Escalates to the downstream veto.
    pub fn mark_bind_failed(&mut self) {
        self.bind_failed = true;
    }

    /// Request an abort of the downstream destructive stage explicitly.
    pub fn request_abort(&mut self) {
        self.explicit_abort = true;
    }

    /// Whether the bind/promotion pass failed.
    pub fn bind_failed(&self) -> bool {
        self.bind_failed
    }

    /// Whether the downstream destructive stage must perform zero
    /// destructive operations.
    pub fn abort_downstream_detach(&self) -> bool {
        self.bind_failed || self.explicit_abort
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_session() {
        let session = ProtectionSession::new();
        assert!(!session.is_active());
        assert!(!session.abort_downstream_detach());
        assert!(!session.is_protected(Handle::new(1)));
        assert!(!session.fingerprint_matches("x-tb", "x-tb.dwg", None));
    }

    #[test]
    fn test_enable_and_match() {
        let mut session = ProtectionSession::new();
        session.enable_protection(Handle::new(5), "x-tb", "C:/p/xrefs/x-tb.dwg", "A-101");

        assert!(session.is_active());
        assert!(session.is_protected(Handle::new(5)));
        assert!(!session.is_protected(Handle::new(6)));
        assert!(session.fingerprint_matches("X-TB", "", None));
    }

    #[test]
    fn test_abort_invariant() {
        let mut session = ProtectionSession::new();
        session.enable_protection(Handle::new(5), "x-tb", "x-tb.dwg", "A-101");
        assert!(!session.abort_downstream_detach());

        session.mark_bind_failed();
        assert!(session.bind_failed());
        assert!(session.abort_downstream_detach());

        // Sticky until reset.
        session.reset();
        assert!(!session.abort_downstream_detach());
        assert!(!session.is_active());
    }

    #[test]
    fn test_explicit_abort_without_bind_failure() {
        let mut session = ProtectionSession::new();
        session.request_abort();
        assert!(session.abort_downstream_detach());
        assert!(!session.bind_failed());
    }

    #[test]
    fn test_update_identity_keeps_layout() {
        let mut session = ProtectionSession::new();
        session.enable_protection(Handle::new(5), "x-tb", "C:/p/xrefs/x-tb.dwg", "A-101");
        session.update_identity(Handle::new(9), "x-tb_1", "C:/p/xrefs/x-tb.dwg");

        assert!(session.is_protected(Handle::new(9)));
        assert!(!session.is_protected(Handle::new(5)));
        let fp = session.fingerprint().unwrap();
        assert_eq!(fp.layout_name, "A-101");
        assert_eq!(fp.file_name_token, "x-tb");
    }

    #[test]
    fn test_enable_clears_previous_failure() {
        let mut session = ProtectionSession::new();
        session.mark_bind_failed();
        session.enable_protection(Handle::new(5), "x-tb", "x-tb.dwg", "A-101");
        assert!(!session.abort_downstream_detach());
    }
}
