//! Entities placed on layouts

use crate::types::{Handle, Vector3};

/// A block reference entity pointing at a block or xref definition.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockReference {
    /// Unique handle
    pub handle: Handle,
    /// Layer the reference sits on
    pub layer: String,
    /// Handle of the definition this reference instantiates
    pub definition: Handle,
    /// Insertion point (in layout coordinates)
    pub insert_point: Vector3,
}

impl BlockReference {
    /// Create a new block reference
    pub fn new(definition: Handle, insert_point: Vector3) -> Self {
        Self {
            handle: Handle::NULL,
            layer: "0".to_string(),
            definition,
            insert_point,
        }
    }

    /// Builder: Set the layer
    pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }
}

/// A raster image entity left behind by the embedding pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    /// Unique handle
    pub handle: Handle,
    /// Layer the image sits on
    pub layer: String,
    /// Source file path
    pub file_name: String,
    /// Insertion point
    pub insert_point: Vector3,
}

impl RasterImage {
    /// Create a new raster image entity
    pub fn new(file_name: impl Into<String>, insert_point: Vector3) -> Self {
        Self {
            handle: Handle::NULL,
            layer: "0".to_string(),
            file_name: file_name.into(),
            insert_point,
        }
    }
}

/// A PDF underlay entity.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfUnderlay {
    /// Unique handle
    pub handle: Handle,
    /// Layer the underlay sits on
    pub layer: String,
    /// Source file path
    pub file_name: String,
    /// Page identifier within the PDF
    pub page: String,
}

impl PdfUnderlay {
    /// Create a new PDF underlay entity
    pub fn new(file_name: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            handle: Handle::NULL,
            layer: "0".to_string(),
            file_name: file_name.into(),
            page: page.into(),
        }
    }
}

/// Any entity a layout can hold at top level.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    BlockReference(BlockReference),
    RasterImage(RasterImage),
    PdfUnderlay(PdfUnderlay),
}

impl Entity {
    /// Get the entity's handle
    pub fn handle(&self) -> Handle {
        match self {
            Entity::BlockReference(e) => e.handle,
            Entity::RasterImage(e) => e.handle,
            Entity::PdfUnderlay(e) => e.handle,
        }
    }

    /// Set the entity's handle
    pub fn set_handle(&mut self, handle: Handle) {
        match self {
            Entity::BlockReference(e) => e.handle = handle,
            Entity::RasterImage(e) => e.handle = handle,
            Entity::PdfUnderlay(e) => e.handle = handle,
        }
    }

    /// Get the layer the entity sits on
    pub fn layer(&self) -> &str {
        match self {
            Entity::BlockReference(e) => &e.layer,
            Entity::RasterImage(e) => &e.layer,
            Entity::PdfUnderlay(e) => &e.layer,
        }
    }

    /// Entity type name
    pub fn entity_type(&self) -> &'static str {
        match self {
            Entity::BlockReference(_) => "INSERT",
            Entity::RasterImage(_) => "IMAGE",
            Entity::PdfUnderlay(_) => "PDFUNDERLAY",
        }
    }

    /// Downcast to a block reference
    pub fn as_block_reference(&self) -> Option<&BlockReference> {
        match self {
            Entity::BlockReference(e) => Some(e),
            _ => None,
        }
    }

    /// Downcast to a mutable block reference
    pub fn as_block_reference_mut(&mut self) -> Option<&mut BlockReference> {
        match self {
            Entity::BlockReference(e) => Some(e),
            _ => None,
        }
    }
}
