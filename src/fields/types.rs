//! Field types and stored value shapes
//!
//! [`FieldType`] is the closed set of field types, each variant carrying the
//! constraints that type supports. [`FieldKind`] is the payload-free tag
//! copied onto every stored value so it can be interpreted without the
//! schema. [`Scalar`] and [`FieldData`] are the shapes a stored value takes.

use crate::error::{Error, Result};
use crate::fields::facets::RangeFacet;
use crate::fields::geometry::{Geometry, GeometryEditorKind, GeometryKind};
use crate::ids::{FieldId, GroupId, ModelId};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// Field Kind
// =============================================================================

/// Payload-free tag of a field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Single-line text
    Text,
    /// Multi-line plain text
    TextArea,
    /// Markdown text
    MarkdownText,
    /// Rich text (HTML)
    RichText,
    /// Reference to an uploaded asset
    Asset,
    /// One value out of a fixed list
    Select,
    /// Tag out of a fixed list
    Tag,
    /// 64-bit integer
    Integer,
    /// Floating point number
    Number,
    /// Boolean
    Bool,
    /// Date or date-time
    Date,
    /// Absolute URL
    #[serde(rename = "URL")]
    Url,
    /// Reference to an item of another model
    Reference,
    /// GeoJSON geometry object
    Geometry,
    /// Geometry drawn in an editor
    GeometryEditor,
    /// Repeatable group of fields
    Group,
}

impl FieldKind {
    /// All field kinds
    pub const ALL: [FieldKind; 16] = [
        FieldKind::Text,
        FieldKind::TextArea,
        FieldKind::MarkdownText,
        FieldKind::RichText,
        FieldKind::Asset,
        FieldKind::Select,
        FieldKind::Tag,
        FieldKind::Integer,
        FieldKind::Number,
        FieldKind::Bool,
        FieldKind::Date,
        FieldKind::Url,
        FieldKind::Reference,
        FieldKind::Geometry,
        FieldKind::GeometryEditor,
        FieldKind::Group,
    ];

    /// Get the kind as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "Text",
            FieldKind::TextArea => "TextArea",
            FieldKind::MarkdownText => "MarkdownText",
            FieldKind::RichText => "RichText",
            FieldKind::Asset => "Asset",
            FieldKind::Select => "Select",
            FieldKind::Tag => "Tag",
            FieldKind::Integer => "Integer",
            FieldKind::Number => "Number",
            FieldKind::Bool => "Bool",
            FieldKind::Date => "Date",
            FieldKind::Url => "URL",
            FieldKind::Reference => "Reference",
            FieldKind::Geometry => "Geometry",
            FieldKind::GeometryEditor => "GeometryEditor",
            FieldKind::Group => "Group",
        }
    }

    /// Names of the constraints this kind accepts
    pub fn constraint_names(&self) -> &'static [&'static str] {
        match self {
            FieldKind::Text | FieldKind::TextArea | FieldKind::MarkdownText | FieldKind::RichText => {
                &["maxLength", "defaultValue"]
            }
            FieldKind::Select | FieldKind::Tag => &["values", "defaultValue"],
            FieldKind::Integer | FieldKind::Number => &["min", "max", "defaultValue"],
            FieldKind::Asset | FieldKind::Bool | FieldKind::Date | FieldKind::Url => {
                &["defaultValue"]
            }
            FieldKind::Reference => &["modelId", "correspondingFieldId"],
            FieldKind::Geometry | FieldKind::GeometryEditor => &["supportedTypes", "defaultValue"],
            FieldKind::Group => &["groupId"],
        }
    }

    /// Whether fields of this kind may be multi-valued
    pub fn supports_multiple(&self) -> bool {
        !matches!(self, FieldKind::Reference)
    }

    /// Whether fields of this kind may carry a default value
    pub fn supports_default(&self) -> bool {
        !matches!(self, FieldKind::Reference | FieldKind::Group)
    }

    /// Whether values of this kind are free text
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            FieldKind::Text | FieldKind::TextArea | FieldKind::MarkdownText | FieldKind::RichText
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Field Type
// =============================================================================

/// A field type together with its constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum FieldType {
    /// Single-line text
    Text {
        /// Maximum length in characters
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    /// Multi-line plain text
    TextArea {
        /// Maximum length in characters
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    /// Markdown text
    MarkdownText {
        /// Maximum length in characters
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    /// Rich text
    RichText {
        /// Maximum length in characters
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    /// Asset id
    Asset,
    /// One of a fixed set of values
    Select {
        /// Allowed values, in display order
        values: IndexSet<String>,
    },
    /// One of a fixed set of tags
    Tag {
        /// Allowed tag names, in display order
        values: IndexSet<String>,
    },
    /// Integer with optional bounds
    Integer {
        /// Lower bound (inclusive)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        /// Upper bound (inclusive)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    /// Number with optional bounds
    Number {
        /// Lower bound (inclusive)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        /// Upper bound (inclusive)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Boolean
    Bool,
    /// Date or date-time
    Date,
    /// Absolute URL
    #[serde(rename = "URL")]
    Url,
    /// Reference to an item of another model
    Reference {
        /// Model of the referenced items
        model_id: ModelId,
        /// Field on the referenced model pointing back, if two-way
        #[serde(default, skip_serializing_if = "Option::is_none")]
        corresponding_field_id: Option<FieldId>,
    },
    /// GeoJSON geometry object
    Geometry {
        /// Accepted geometry types
        supported_types: BTreeSet<GeometryKind>,
    },
    /// Geometry drawn in an editor
    GeometryEditor {
        /// Shapes the editor may produce
        supported_types: GeometryEditorKind,
    },
    /// Repeatable group of fields
    Group {
        /// The group whose schema describes the nested fields
        group_id: GroupId,
    },
}

impl FieldType {
    /// Plain text field without constraints
    pub fn text() -> Self {
        FieldType::Text { max_length: None }
    }

    /// Integer field with the given bounds
    pub fn integer(min: Option<i64>, max: Option<i64>) -> Self {
        FieldType::Integer { min, max }
    }

    /// Number field with the given bounds
    pub fn number(min: Option<f64>, max: Option<f64>) -> Self {
        FieldType::Number { min, max }
    }

    /// Select field over the given values
    pub fn select<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldType::Select {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Tag field over the given tag names
    pub fn tag<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldType::Tag {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Geometry field accepting the given types
    pub fn geometry<I>(supported_types: I) -> Self
    where
        I: IntoIterator<Item = GeometryKind>,
    {
        FieldType::Geometry {
            supported_types: supported_types.into_iter().collect(),
        }
    }

    /// Get the payload-free tag of this type
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldType::Text { .. } => FieldKind::Text,
            FieldType::TextArea { .. } => FieldKind::TextArea,
            FieldType::MarkdownText { .. } => FieldKind::MarkdownText,
            FieldType::RichText { .. } => FieldKind::RichText,
            FieldType::Asset => FieldKind::Asset,
            FieldType::Select { .. } => FieldKind::Select,
            FieldType::Tag { .. } => FieldKind::Tag,
            FieldType::Integer { .. } => FieldKind::Integer,
            FieldType::Number { .. } => FieldKind::Number,
            FieldType::Bool => FieldKind::Bool,
            FieldType::Date => FieldKind::Date,
            FieldType::Url => FieldKind::Url,
            FieldType::Reference { .. } => FieldKind::Reference,
            FieldType::Geometry { .. } => FieldKind::Geometry,
            FieldType::GeometryEditor { .. } => FieldKind::GeometryEditor,
            FieldType::Group { .. } => FieldKind::Group,
        }
    }

    /// Check that the constraints are consistent with each other
    pub fn validate_constraints(&self) -> Result<()> {
        match self {
            FieldType::Text { max_length }
            | FieldType::TextArea { max_length }
            | FieldType::MarkdownText { max_length }
            | FieldType::RichText { max_length } => {
                if *max_length == Some(0) {
                    return Err(Error::InvalidConstraint(
                        "maxLength must be greater than 0".to_string(),
                    ));
                }
            }
            FieldType::Select { values } | FieldType::Tag { values } => {
                if values.is_empty() {
                    return Err(Error::InvalidConstraint(format!(
                        "{} field needs at least one value",
                        self.kind()
                    )));
                }
                if values.iter().any(|v| v.trim().is_empty()) {
                    return Err(Error::InvalidConstraint(format!(
                        "{} values must not be blank",
                        self.kind()
                    )));
                }
            }
            FieldType::Integer { min, max } => {
                if !RangeFacet::new(*min, *max).is_consistent() {
                    return Err(Error::InvalidConstraint(
                        "min must not be greater than max".to_string(),
                    ));
                }
            }
            FieldType::Number { min, max } => {
                let finite = min.map_or(true, f64::is_finite) && max.map_or(true, f64::is_finite);
                if !finite || !RangeFacet::new(*min, *max).is_consistent() {
                    return Err(Error::InvalidConstraint(
                        "min and max must be finite and min must not be greater than max"
                            .to_string(),
                    ));
                }
            }
            FieldType::Geometry { supported_types } => {
                if supported_types.is_empty() {
                    return Err(Error::InvalidConstraint(
                        "Geometry field needs at least one supported type".to_string(),
                    ));
                }
            }
            FieldType::Asset
            | FieldType::Bool
            | FieldType::Date
            | FieldType::Url
            | FieldType::Reference { .. }
            | FieldType::GeometryEditor { .. }
            | FieldType::Group { .. } => {}
        }
        Ok(())
    }
}

// =============================================================================
// Stored Values
// =============================================================================

/// A single coerced value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Number value
    Number(f64),
    /// String value (text, ids, dates, URLs)
    Text(String),
    /// Geometry value
    Geometry(Geometry),
}

impl Scalar {
    /// Borrow the value as a string, if it is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert back into a JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            Scalar::Bool(b) => JsonValue::Bool(*b),
            Scalar::Integer(i) => JsonValue::from(*i),
            Scalar::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Scalar::Text(s) => JsonValue::String(s.clone()),
            Scalar::Geometry(g) => g.to_json(),
        }
    }
}

/// The stored value of a field: one scalar, or an ordered list for
/// multi-valued fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldData {
    /// Ordered values of a multi-valued field
    Multiple(Vec<Scalar>),
    /// Value of a single-valued field
    Single(Scalar),
}

impl FieldData {
    /// The single value, if this is not a list
    pub fn as_single(&self) -> Option<&Scalar> {
        match self {
            FieldData::Single(s) => Some(s),
            FieldData::Multiple(_) => None,
        }
    }

    /// The list of values, if this is a list
    pub fn as_multiple(&self) -> Option<&[Scalar]> {
        match self {
            FieldData::Multiple(values) => Some(values),
            FieldData::Single(_) => None,
        }
    }

    /// Iterate over every scalar
    pub fn scalars(&self) -> impl Iterator<Item = &Scalar> {
        let slice: &[Scalar] = match self {
            FieldData::Single(s) => std::slice::from_ref(s),
            FieldData::Multiple(values) => values,
        };
        slice.iter()
    }

    /// Convert back into a JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldData::Single(s) => s.to_json(),
            FieldData::Multiple(values) => values.iter().map(Scalar::to_json).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_type_json_shape() {
        let ft = FieldType::integer(Some(0), Some(10));
        let value = serde_json::to_value(&ft).unwrap();
        assert_eq!(value, json!({"type": "Integer", "min": 0, "max": 10}));

        let parsed: FieldType =
            serde_json::from_value(json!({"type": "Text", "maxLength": 20})).unwrap();
        assert_eq!(parsed, FieldType::Text { max_length: Some(20) });

        let url: FieldType = serde_json::from_value(json!({"type": "URL"})).unwrap();
        assert_eq!(url.kind(), FieldKind::Url);
    }

    #[test]
    fn test_geometry_type_json_shape() {
        let parsed: FieldType = serde_json::from_value(json!({
            "type": "Geometry",
            "supportedTypes": ["POINT", "POLYGON"]
        }))
        .unwrap();
        assert_eq!(
            parsed,
            FieldType::geometry([GeometryKind::Point, GeometryKind::Polygon])
        );
    }

    #[test]
    fn test_kind_is_exhaustive() {
        for kind in FieldKind::ALL {
            assert!(!kind.constraint_names().is_empty());
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                JsonValue::String(kind.as_str().to_string())
            );
        }
    }

    #[test]
    fn test_validate_constraints() {
        assert!(FieldType::integer(Some(1), Some(0)).validate_constraints().is_err());
        assert!(FieldType::integer(None, Some(0)).validate_constraints().is_ok());
        assert!(FieldType::number(Some(f64::NAN), None).validate_constraints().is_err());
        assert!(FieldType::select(Vec::<String>::new()).validate_constraints().is_err());
        assert!(FieldType::tag(["a", " "]).validate_constraints().is_err());
        assert!(FieldType::Text { max_length: Some(0) }.validate_constraints().is_err());
        assert!(FieldType::geometry([]).validate_constraints().is_err());
        assert!(FieldType::select(["a", "b"]).validate_constraints().is_ok());
    }

    #[test]
    fn test_field_data_untagged() {
        let single: FieldData = serde_json::from_value(json!(5)).unwrap();
        assert_eq!(single, FieldData::Single(Scalar::Integer(5)));

        let multiple: FieldData = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(
            multiple,
            FieldData::Multiple(vec![Scalar::Text("a".into()), Scalar::Text("b".into())])
        );
        assert_eq!(multiple.to_json(), json!(["a", "b"]));
        assert_eq!(multiple.scalars().count(), 2);
    }
}
