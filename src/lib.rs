//! # cms-content
//!
//! Schema-driven typed content model with a versioned publish/review
//! workflow for a headless CMS.
//!
//! ## Features
//!
//! - Closed set of field types with constraint checking and value coercion
//! - Structural validation of GeoJSON geometry payloads
//! - Ordered schemas with key grammar, key derivation and a single title field
//! - Versioned items with `latest` / `published` refs
//! - Review requests as a state machine gating publication
//! - Derived item status for badge rendering
//!
//! All operations are pure: they take a snapshot and return a new one or an
//! error. Timestamps and configuration are passed in explicitly.
//!
//! ## Example
//!
//! ```rust
//! use cms_content::fields::FieldType;
//! use cms_content::ids::{FieldId, SchemaId};
//! use cms_content::schema::{Field, Schema, SchemaKind};
//!
//! let schema = Schema::new(SchemaId::from("s1"), SchemaKind::Content)
//!     .add_field(Field::new(FieldId::from("f1"), "Title", FieldType::text()).title())?
//!     .add_field(Field::new(FieldId::from("f2"), "Body", FieldType::text()))?;
//!
//! assert_eq!(schema.title_field().map(|f| f.key.as_str()), Some("title"));
//! # Ok::<(), cms_content::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod ids;
pub mod limits;
pub mod settings;

// Field types and values
pub mod fields;
pub mod multiple;
pub mod names;

// Schema and workflow
pub mod item;
pub mod request;
pub mod schema;
pub mod status;

// Re-exports for convenience
pub use error::{Error, Result, SchemaViolation, ValidationError};
pub use fields::{FieldData, FieldKind, FieldType, FieldTypeRegistry, Geometry, Scalar};
pub use item::{FieldInput, FieldValue, Item, ItemRecord, RefName};
pub use limits::Limits;
pub use request::{NewRequest, Request, RequestItem, RequestState};
pub use schema::{Field, Model, Schema, SchemaKind};
pub use settings::Settings;
pub use status::ItemStatus;

/// Version of the cms-content library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
