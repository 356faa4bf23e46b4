//! Layout (sheet) records

use crate::types::Handle;

/// A named layout.
///
/// Every document has exactly one model layout; all others are paper-space
/// sheets. Title-block candidates are only collected from paper space.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Unique handle
    pub handle: Handle,
    /// Layout name
    pub name: String,
    /// True for the model layout
    pub is_model: bool,
    /// Handles of the top-level entities placed on this layout
    pub entities: Vec<Handle>,
}

impl Layout {
    /// Create a paper-space layout
    pub fn new(name: impl Into<String>) -> Self {
        Layout {
            handle: Handle::NULL,
            name: name.into(),
            is_model: false,
            entities: Vec::new(),
        }
    }

    /// Create the model layout
    pub fn model() -> Self {
        Layout {
            handle: Handle::NULL,
            name: "Model".to_string(),
            is_model: true,
            entities: Vec::new(),
        }
    }

    /// Check if this is a paper-space layout
    pub fn is_paper(&self) -> bool {
        !self.is_model
    }

    /// Number of top-level entities on the layout
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}
