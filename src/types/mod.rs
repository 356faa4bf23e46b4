//! Core value types

pub mod handle;
pub mod vector;

pub use handle::Handle;
pub use vector::{Vector2, Vector3};
