//! External reference definitions

use crate::document::path;
use crate::types::Handle;

/// How an external reference participates in nesting and binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefKind {
    /// Attached reference; visible through nesting and bindable.
    Attached,
    /// Overlay reference; not visible through nesting and cannot be bound
    /// directly; it must be promoted to an attached reference first.
    Overlay,
}

/// Resolution state of an external reference definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefStatus {
    /// Source file was found and loaded.
    Resolved,
    /// Source file has not been resolved (yet).
    Unresolved,
    /// Source file is known to be missing.
    FileNotFound,
}

/// An external reference definition.
///
/// The handle is the host-assigned identity and is only stable until the
/// next attach/detach/bind; the name + path pair is what survives.
#[derive(Debug, Clone)]
pub struct XrefDefinition {
    /// Unique handle (reissued by mutating operations)
    pub handle: Handle,
    /// Block name the reference is inserted under
    pub name: String,
    /// Raw source path as recorded in the document
    pub path: String,
    /// Attached or overlay
    pub kind: XrefKind,
    /// Resolution state
    pub status: XrefStatus,
    /// Canonical resolved location, when resolution succeeded
    pub resolved_path: Option<String>,
}

impl XrefDefinition {
    /// Create a new, not-yet-resolved definition
    pub fn new(name: impl Into<String>, path: impl Into<String>, kind: XrefKind) -> Self {
        Self {
            handle: Handle::NULL,
            name: name.into(),
            path: path.into(),
            kind,
            status: XrefStatus::Unresolved,
            resolved_path: None,
        }
    }

    /// Check if this is an overlay reference
    pub fn is_overlay(&self) -> bool {
        self.kind == XrefKind::Overlay
    }

    /// Check if this is an attached reference
    pub fn is_attached(&self) -> bool {
        self.kind == XrefKind::Attached
    }

    /// Check if the source file was resolved
    pub fn is_resolved(&self) -> bool {
        self.status == XrefStatus::Resolved
    }

    /// Check if the reference points at a drawing-format file
    pub fn is_drawing_format(&self) -> bool {
        path::is_drawing_file(self.resolved_path.as_deref().unwrap_or(&self.path))
    }

    /// The path to report and compare: resolved when available, raw otherwise
    pub fn effective_path(&self) -> &str {
        self.resolved_path.as_deref().unwrap_or(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_creation() {
        let def = XrefDefinition::new("x-tb", "xrefs/x-tb.dwg", XrefKind::Attached);
        assert!(def.is_attached());
        assert!(!def.is_overlay());
        assert!(!def.is_resolved());
        assert!(def.is_drawing_format());
    }

    #[test]
    fn test_effective_path_prefers_resolved() {
        let mut def = XrefDefinition::new("x-tb", "x-tb.dwg", XrefKind::Overlay);
        assert_eq!(def.effective_path(), "x-tb.dwg");
        def.resolved_path = Some("c:/proj/xrefs/x-tb.dwg".to_string());
        assert_eq!(def.effective_path(), "c:/proj/xrefs/x-tb.dwg");
    }

    #[test]
    fn test_non_drawing_format() {
        let def = XrefDefinition::new("logo", "images/logo.png", XrefKind::Attached);
        assert!(!def.is_drawing_format());
    }
}
