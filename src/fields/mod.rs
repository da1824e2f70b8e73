//! Field types, value coercion and geometry validation
//!
//! This module contains the type system for content fields.

pub mod facets;
pub mod geometry;
pub mod registry;
pub mod types;

// Re-exports
pub use geometry::{Geometry, GeometryEditorKind, GeometryKind};
pub use registry::FieldTypeRegistry;
pub use types::{FieldData, FieldKind, FieldType, Scalar};
