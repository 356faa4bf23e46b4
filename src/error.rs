//! Error types for xrefguard

use thiserror::Error;

/// Main error type for xrefguard operations
#[derive(Debug, Error)]
pub enum GuardError {
    /// A layout referenced by name does not exist
    #[error("Layout not found: {0}")]
    LayoutNotFound(String),

    /// A layer referenced by name does not exist
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    /// An object referenced by handle does not exist
    #[error("Object not found: handle {0}")]
    ObjectNotFound(crate::types::Handle),

    /// An external reference definition is missing from the document
    #[error("External reference not found: {0}")]
    XrefNotFound(String),

    /// A table entry with the same name already exists
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// The reference does not point at a drawing-format file
    #[error("Not a drawing file: '{name}' -> {path}")]
    NotDrawingFormat { name: String, path: String },

    /// The reference could not be resolved against disk or search paths
    #[error("Unresolved reference: '{name}' -> {path}")]
    Unresolved { name: String, path: String },

    /// Attaching an external reference failed
    #[error("Attach failed for '{path}': {reason}")]
    AttachFailed { path: String, reason: String },

    /// A block reference sits on a locked layer and cannot be retargeted
    #[error("Layer is locked: {0}")]
    LayerLocked(String),

    /// A manual pick was not backed by an external reference
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// Generic error with custom message
    #[error("{0}")]
    Custom(String),
}

/// Result type alias for xrefguard operations
pub type Result<T> = std::result::Result<T, GuardError>;

impl From<String> for GuardError {
    fn from(s: String) -> Self {
        GuardError::Custom(s)
    }
}

impl From<&str> for GuardError {
    fn from(s: &str) -> Self {
        GuardError::Custom(s.to_string())
    }
}
