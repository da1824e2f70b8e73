//! Field type registry: value coercion and default checks
//!
//! Coercion is type narrowing only. A raw JSON value either already has the
//! shape the field type wants (string, number, bool, geometry object) or it
//! is rejected; numeric strings are never parsed into numbers.

use crate::error::{Error, Result, ValidationError};
use crate::fields::facets::{EnumerationFacet, MaxLengthFacet, RangeFacet};
use crate::fields::geometry;
use crate::fields::types::{FieldData, FieldKind, FieldType, Scalar};
use crate::limits::Limits;
use crate::schema::Field;
use chrono::{DateTime, NaiveDate};
use serde_json::Value as JsonValue;
use tracing::trace;

/// Coerces raw values into stored values for every field type
#[derive(Debug, Clone, Default)]
pub struct FieldTypeRegistry {
    limits: Limits,
}

impl FieldTypeRegistry {
    /// Create a registry enforcing the given limits
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    /// The limits this registry enforces
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Names of the constraints a field kind accepts
    pub fn constraint_names(&self, kind: FieldKind) -> &'static [&'static str] {
        kind.constraint_names()
    }

    /// Coerce one raw value against a field type
    pub fn coerce(&self, field_type: &FieldType, raw: &JsonValue) -> Result<Scalar> {
        let scalar = match field_type {
            FieldType::Text { max_length }
            | FieldType::TextArea { max_length }
            | FieldType::MarkdownText { max_length }
            | FieldType::RichText { max_length } => {
                let s = expect_str(raw)?;
                self.limits.check_text_length(s.chars().count())?;
                if let Some(max) = max_length {
                    MaxLengthFacet::new(*max).validate(s)?;
                }
                Scalar::Text(s.to_string())
            }
            FieldType::Asset | FieldType::Reference { .. } | FieldType::Group { .. } => {
                Scalar::Text(expect_id(raw)?.to_string())
            }
            FieldType::Select { values } | FieldType::Tag { values } => {
                let s = expect_str(raw)?;
                EnumerationFacet::new(values).validate(s)?;
                Scalar::Text(s.to_string())
            }
            FieldType::Integer { min, max } => {
                let n = raw.as_i64().ok_or_else(|| mismatch("integer", raw))?;
                RangeFacet::new(*min, *max).validate(n)?;
                Scalar::Integer(n)
            }
            FieldType::Number { min, max } => {
                let n = raw.as_f64().ok_or_else(|| mismatch("number", raw))?;
                RangeFacet::new(*min, *max).validate(n)?;
                Scalar::Number(n)
            }
            FieldType::Bool => Scalar::Bool(raw.as_bool().ok_or_else(|| mismatch("boolean", raw))?),
            FieldType::Date => {
                let s = expect_str(raw)?;
                if !is_date(s) {
                    return Err(ValidationError::new("expected a date")
                        .with_reason(format!("'{}' is neither RFC 3339 nor YYYY-MM-DD", s))
                        .into());
                }
                Scalar::Text(s.to_string())
            }
            FieldType::Url => {
                let s = expect_str(raw)?;
                url::Url::parse(s).map_err(|e| {
                    ValidationError::new("expected an absolute URL").with_reason(e.to_string())
                })?;
                Scalar::Text(s.to_string())
            }
            FieldType::Geometry { supported_types } => {
                let geometry = geometry::validate_with_limits(raw, &self.limits)?;
                if !supported_types.contains(&geometry.kind()) {
                    return Err(unsupported_geometry(geometry.kind()).into());
                }
                Scalar::Geometry(geometry)
            }
            FieldType::GeometryEditor { supported_types } => {
                let geometry = geometry::validate_with_limits(raw, &self.limits)?;
                if !supported_types.accepts(geometry.kind()) {
                    return Err(unsupported_geometry(geometry.kind()).into());
                }
                Scalar::Geometry(geometry)
            }
        };

        trace!(kind = %field_type.kind(), "coerced value");
        Ok(scalar)
    }

    /// Coerce a raw editor value for a field.
    ///
    /// Empty strings, `null` and empty arrays become `None`. Multi-valued
    /// fields require an array; `null` and empty-string elements (blank
    /// editor rows) are dropped and every remaining element is coerced. Any
    /// failing element rejects the whole value.
    pub fn coerce_field(&self, field: &Field, raw: &JsonValue) -> Result<Option<FieldData>> {
        if is_empty(raw) {
            return Ok(None);
        }

        let result = if field.multiple {
            self.coerce_multiple(&field.field_type, raw).map(|values| {
                if values.is_empty() {
                    None
                } else {
                    Some(FieldData::Multiple(values))
                }
            })
        } else if raw.is_array() {
            Err(ValidationError::new("field does not accept multiple values").into())
        } else {
            self.coerce(&field.field_type, raw)
                .map(|scalar| Some(FieldData::Single(scalar)))
        };

        result.map_err(|err| in_field(err, field))
    }

    fn coerce_multiple(&self, field_type: &FieldType, raw: &JsonValue) -> Result<Vec<Scalar>> {
        let elements = raw
            .as_array()
            .ok_or_else(|| mismatch("array of values", raw))?;

        let mut values = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            if is_blank(element) {
                continue;
            }
            let scalar = self
                .coerce(field_type, element)
                .map_err(|err| at_index(err, index))?;
            values.push(scalar);
        }

        self.limits.check_multiple_values(values.len())?;
        Ok(values)
    }

    /// Check whether a default value satisfies the field type's constraints
    pub fn validate_default(&self, field_type: &FieldType, multiple: bool, value: &FieldData) -> bool {
        if !field_type.kind().supports_default() {
            return false;
        }
        match (multiple, value) {
            (false, FieldData::Single(scalar)) => self.coerce(field_type, &scalar.to_json()).is_ok(),
            (true, FieldData::Multiple(values)) => {
                self.limits.check_multiple_values(values.len()).is_ok()
                    && values
                        .iter()
                        .all(|scalar| self.coerce(field_type, &scalar.to_json()).is_ok())
            }
            _ => false,
        }
    }
}

/// Whether a raw value counts as "unset"
pub fn is_empty(raw: &JsonValue) -> bool {
    match raw {
        JsonValue::Null => true,
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(values) => values.is_empty(),
        _ => false,
    }
}

fn is_blank(raw: &JsonValue) -> bool {
    matches!(raw, JsonValue::Null) || matches!(raw, JsonValue::String(s) if s.is_empty())
}

fn json_type_name(raw: &JsonValue) -> &'static str {
    match raw {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(n) if n.is_f64() => "number",
        JsonValue::Number(_) => "integer",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn mismatch(expected: &str, raw: &JsonValue) -> ValidationError {
    ValidationError::new(format!("expected {}", expected))
        .with_reason(format!("found {}", json_type_name(raw)))
}

fn expect_str(raw: &JsonValue) -> std::result::Result<&str, ValidationError> {
    raw.as_str().ok_or_else(|| mismatch("string", raw))
}

fn expect_id(raw: &JsonValue) -> std::result::Result<&str, ValidationError> {
    let s = expect_str(raw)?;
    if s.trim().is_empty() {
        Err(ValidationError::new("expected a non-empty id"))
    } else {
        Ok(s)
    }
}

fn is_date(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok() || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn unsupported_geometry(kind: geometry::GeometryKind) -> ValidationError {
    ValidationError::new(format!("geometry type {} is not supported by this field", kind))
}

fn at_index(err: Error, index: usize) -> Error {
    match err {
        Error::Validation(v) => Error::Validation(v.with_index(index)),
        Error::Schema(mut s) => {
            s.path = format!("/{}{}", index, s.path);
            Error::Schema(s)
        }
        other => other,
    }
}

fn in_field(err: Error, field: &Field) -> Error {
    match err {
        Error::Validation(v) => Error::Validation(
            v.with_field(field.id.as_str()).with_key(field.key.as_str()),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::geometry::{GeometryEditorKind, GeometryKind};
    use crate::ids::{FieldId, ModelId};
    use serde_json::json;

    fn registry() -> FieldTypeRegistry {
        FieldTypeRegistry::default()
    }

    #[test]
    fn test_text_narrowing() {
        let ft = FieldType::Text { max_length: Some(5) };
        assert_eq!(registry().coerce(&ft, &json!("hello")).unwrap(), Scalar::Text("hello".into()));
        assert!(registry().coerce(&ft, &json!("hello!")).is_err());
        assert!(registry().coerce(&ft, &json!(5)).is_err());
    }

    #[test]
    fn test_integer_rejects_numeric_string() {
        let ft = FieldType::integer(Some(0), Some(10));
        assert_eq!(registry().coerce(&ft, &json!(7)).unwrap(), Scalar::Integer(7));
        assert!(matches!(registry().coerce(&ft, &json!("7")), Err(Error::Validation(_))));
        assert!(registry().coerce(&ft, &json!(7.5)).is_err());
        assert!(registry().coerce(&ft, &json!(11)).is_err());
        assert!(registry().coerce(&ft, &json!(-1)).is_err());
    }

    #[test]
    fn test_number_bounds_one_sided() {
        let ft = FieldType::number(None, Some(1.5));
        assert_eq!(registry().coerce(&ft, &json!(1)).unwrap(), Scalar::Number(1.0));
        assert!(registry().coerce(&ft, &json!(-1e9)).is_ok());
        assert!(registry().coerce(&ft, &json!(1.6)).is_err());
    }

    #[test]
    fn test_select_membership() {
        let ft = FieldType::select(["draft", "final"]);
        assert!(registry().coerce(&ft, &json!("final")).is_ok());
        let err = registry().coerce(&ft, &json!("other")).unwrap_err();
        assert!(err.to_string().contains("other"));
    }

    #[test]
    fn test_bool_date_url() {
        assert_eq!(registry().coerce(&FieldType::Bool, &json!(true)).unwrap(), Scalar::Bool(true));
        assert!(registry().coerce(&FieldType::Bool, &json!("true")).is_err());

        assert!(registry().coerce(&FieldType::Date, &json!("2024-02-29")).is_ok());
        assert!(registry().coerce(&FieldType::Date, &json!("2024-02-29T10:00:00Z")).is_ok());
        assert!(registry().coerce(&FieldType::Date, &json!("2023-02-29")).is_err());

        assert!(registry().coerce(&FieldType::Url, &json!("https://example.com/a")).is_ok());
        assert!(registry().coerce(&FieldType::Url, &json!("example.com")).is_err());
    }

    #[test]
    fn test_reference_needs_id() {
        let ft = FieldType::Reference {
            model_id: ModelId::from("m1"),
            corresponding_field_id: None,
        };
        assert!(registry().coerce(&ft, &json!("item-1")).is_ok());
        assert!(registry().coerce(&ft, &json!("  ")).is_err());
    }

    #[test]
    fn test_geometry_supported_types() {
        let ft = FieldType::geometry([GeometryKind::Point]);
        let point = json!({"type": "Point", "coordinates": [1, 2]});
        let line = json!({"type": "LineString", "coordinates": [[1, 2], [3, 4]]});
        assert!(registry().coerce(&ft, &point).is_ok());
        assert!(matches!(registry().coerce(&ft, &line), Err(Error::Validation(_))));
        assert!(matches!(
            registry().coerce(&ft, &json!({"type": "Point", "coordinates": [1]})),
            Err(Error::Schema(_))
        ));

        let editor = FieldType::GeometryEditor {
            supported_types: GeometryEditorKind::Any,
        };
        assert!(registry().coerce(&editor, &line).is_ok());
    }

    #[test]
    fn test_coerce_field_normalizes_empty() {
        let field = Field::new(FieldId::from("f1"), "Title", FieldType::text());
        assert_eq!(registry().coerce_field(&field, &json!("")).unwrap(), None);
        assert_eq!(registry().coerce_field(&field, &json!(null)).unwrap(), None);
        assert_eq!(registry().coerce_field(&field, &json!([])).unwrap(), None);
        assert!(registry().coerce_field(&field, &json!(["a"])).is_err());
    }

    #[test]
    fn test_coerce_field_multiple_all_or_nothing() {
        let field = Field::new(FieldId::from("f1"), "Scores", FieldType::integer(Some(0), Some(10)))
            .multiple();
        let ok = registry().coerce_field(&field, &json!([1, 5])).unwrap();
        assert_eq!(
            ok,
            Some(FieldData::Multiple(vec![Scalar::Integer(1), Scalar::Integer(5)]))
        );

        match registry().coerce_field(&field, &json!([1, "bad", 5])) {
            Err(Error::Validation(err)) => {
                assert_eq!(err.index, Some(1));
                assert_eq!(err.key.as_deref(), Some("scores"));
                assert_eq!(err.field_id.as_deref(), Some("f1"));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(registry().coerce_field(&field, &json!(3)).is_err());
        assert_eq!(registry().coerce_field(&field, &json!([null, ""])).unwrap(), None);
    }

    #[test]
    fn test_multiple_value_limit() {
        let registry = FieldTypeRegistry::new(Limits {
            max_multiple_values: 2,
            ..Limits::default()
        });
        let field = Field::new(FieldId::from("f1"), "Flags", FieldType::Bool).multiple();
        assert!(registry.coerce_field(&field, &json!([true, false])).is_ok());
        assert!(matches!(
            registry.coerce_field(&field, &json!([true, false, true])),
            Err(Error::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_geometry_error_path_in_list() {
        let field = Field::new(
            FieldId::from("f1"),
            "Places",
            FieldType::geometry([GeometryKind::Point]),
        )
        .multiple();
        let raw = json!([
            {"type": "Point", "coordinates": [1, 2]},
            {"type": "Point", "coordinates": ["x", 2]}
        ]);
        match registry().coerce_field(&field, &raw) {
            Err(Error::Schema(v)) => assert_eq!(v.path, "/1/coordinates/0"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_validate_default() {
        let ft = FieldType::integer(Some(0), Some(10));
        assert!(registry().validate_default(&ft, false, &FieldData::Single(Scalar::Integer(3))));
        assert!(!registry().validate_default(&ft, false, &FieldData::Single(Scalar::Integer(30))));
        assert!(!registry().validate_default(&ft, true, &FieldData::Single(Scalar::Integer(3))));
        assert!(registry().validate_default(
            &ft,
            true,
            &FieldData::Multiple(vec![Scalar::Integer(1), Scalar::Integer(2)])
        ));

        let reference = FieldType::Reference {
            model_id: ModelId::from("m"),
            corresponding_field_id: None,
        };
        assert!(!registry().validate_default(&reference, false, &FieldData::Single(Scalar::Text("x".into()))));
    }

    #[test]
    fn test_constraint_names() {
        assert_eq!(
            registry().constraint_names(FieldKind::Integer),
            &["min", "max", "defaultValue"]
        );
    }
}
