//! Schemas and field definitions
//!
//! A [`Schema`] is an ordered collection of [`Field`]s. Every mutator takes
//! the current snapshot and returns a new one, or an error and no change.
//!
//! Invariants:
//! - field keys match the key grammar and are unique (case-insensitive)
//! - at most one field has `is_title` set
//! - field order is significant and is exactly the set of field ids

use crate::error::{Error, Result};
use crate::fields::{FieldData, FieldKind, FieldType, FieldTypeRegistry};
use crate::ids::{FieldId, ModelId, SchemaId};
use crate::names::{derive_key, keys_equal, validate_key};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

// =============================================================================
// Schema Kind
// =============================================================================

/// What a schema describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    /// Content fields of a model
    #[default]
    Content,
    /// Metadata fields of a model
    Metadata,
    /// Nested fields of a repeatable group
    Group,
}

impl SchemaKind {
    /// Whether a field of `kind` may be added to a schema of this kind
    pub fn allows(&self, kind: FieldKind) -> bool {
        match self {
            SchemaKind::Content => true,
            SchemaKind::Metadata => matches!(
                kind,
                FieldKind::Tag | FieldKind::Bool | FieldKind::Date | FieldKind::Text | FieldKind::Url
            ),
            SchemaKind::Group => kind != FieldKind::Group,
        }
    }

    /// Get the kind as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Content => "content",
            SchemaKind::Metadata => "metadata",
            SchemaKind::Group => "group",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Field
// =============================================================================

/// A typed slot in a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Server-assigned id, immutable once created
    pub id: FieldId,
    /// Human slug, unique within the schema
    pub key: String,
    /// Display title
    pub title: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Type and constraints
    #[serde(rename = "typeProperty")]
    pub field_type: FieldType,
    /// A value must be present
    #[serde(default)]
    pub required: bool,
    /// No two items may hold the same value
    #[serde(default)]
    pub unique: bool,
    /// The value is an ordered list
    #[serde(default)]
    pub multiple: bool,
    /// The value is used as the item's display title
    #[serde(default)]
    pub is_title: bool,
    /// Value suggested for new items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<FieldData>,
    /// Set once the key was chosen by hand; disables key derivation
    #[serde(default)]
    pub key_customized: bool,
}

impl Field {
    /// Create a field whose key is derived from the title.
    ///
    /// When nothing usable can be derived the key is left empty and the
    /// schema will reject the field until a key is set.
    pub fn new(id: FieldId, title: impl Into<String>, field_type: FieldType) -> Self {
        let title = title.into();
        let key = derive_key(&title).unwrap_or_default();
        Self {
            id,
            key,
            title,
            description: None,
            field_type,
            required: false,
            unique: false,
            multiple: false,
            is_title: false,
            default_value: None,
            key_customized: false,
        }
    }

    /// Set the key by hand
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.key_customized = derive_key(&self.title).as_deref() != Some(key.as_str());
        self.key = key;
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the default value
    pub fn with_default(mut self, value: FieldData) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the field as unique
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark the field as multi-valued
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Mark the field as the title field
    pub fn title(mut self) -> Self {
        self.is_title = true;
        self
    }

    /// Get the payload-free type tag
    pub fn kind(&self) -> FieldKind {
        self.field_type.kind()
    }

    /// Check the field on its own, without regard to its siblings
    pub fn validate(&self, registry: &FieldTypeRegistry) -> Result<()> {
        validate_key(&self.key)?;
        self.field_type.validate_constraints()?;

        if self.multiple && !self.kind().supports_multiple() {
            return Err(Error::InvalidConstraint(format!(
                "{} fields cannot be multiple",
                self.kind()
            )));
        }

        if let Some(ref default) = self.default_value {
            if !registry.validate_default(&self.field_type, self.multiple, default) {
                return Err(Error::InvalidConstraint(format!(
                    "default value of field '{}' does not satisfy its constraints",
                    self.key
                )));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Schema
// =============================================================================

/// Serialized form of a schema: fields as an ordered list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaRepr {
    id: SchemaId,
    #[serde(default)]
    kind: SchemaKind,
    #[serde(default)]
    fields: Vec<Field>,
}

/// An ordered collection of fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "SchemaRepr", try_from = "SchemaRepr")]
pub struct Schema {
    id: SchemaId,
    kind: SchemaKind,
    fields: IndexMap<FieldId, Field>,
}

// IndexMap equality ignores order; field order is part of a schema.
impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.kind == other.kind && self.fields.iter().eq(other.fields.iter())
    }
}

impl From<Schema> for SchemaRepr {
    fn from(schema: Schema) -> Self {
        SchemaRepr {
            id: schema.id,
            kind: schema.kind,
            fields: schema.fields.into_values().collect(),
        }
    }
}

impl TryFrom<SchemaRepr> for Schema {
    type Error = Error;

    fn try_from(repr: SchemaRepr) -> Result<Self> {
        Schema::from_fields(repr.id, repr.kind, repr.fields)
    }
}

impl Schema {
    /// Create an empty schema
    pub fn new(id: SchemaId, kind: SchemaKind) -> Self {
        Self {
            id,
            kind,
            fields: IndexMap::new(),
        }
    }

    /// Build a schema from raw field definitions, validating every invariant.
    ///
    /// Unlike [`Schema::add_field`], a second title field is an error here
    /// rather than a takeover: raw payloads are not allowed to be ambiguous.
    pub fn from_fields(id: SchemaId, kind: SchemaKind, fields: Vec<Field>) -> Result<Self> {
        let titles = fields.iter().filter(|f| f.is_title).count();
        if titles > 1 {
            return Err(Error::InvalidConstraint(format!(
                "schema {} has {} title fields",
                id, titles
            )));
        }

        let mut schema = Schema::new(id, kind);
        for mut field in fields {
            // A stored key that no longer matches its title was set by hand.
            field.key_customized |= derive_key(&field.title).as_deref() != Some(field.key.as_str());
            schema = schema.add_field(field)?;
        }
        Ok(schema)
    }

    /// Get the schema id
    pub fn id(&self) -> &SchemaId {
        &self.id
    }

    /// Get the schema kind
    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    /// Iterate over fields in order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// Field ids in order
    pub fn order(&self) -> Vec<FieldId> {
        self.fields.keys().cloned().collect()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by id
    pub fn field(&self, id: &FieldId) -> Option<&Field> {
        self.fields.get(id)
    }

    /// Whether a field with this id exists
    pub fn contains(&self, id: &FieldId) -> bool {
        self.fields.contains_key(id)
    }

    /// Look up a field by key (case-insensitive)
    pub fn field_by_key(&self, key: &str) -> Option<&Field> {
        self.fields.values().find(|f| keys_equal(&f.key, key))
    }

    /// The field marked as title, if any
    pub fn title_field(&self) -> Option<&Field> {
        self.fields.values().find(|f| f.is_title)
    }

    fn require(&self, id: &FieldId) -> Result<&Field> {
        self.field(id).ok_or_else(|| Error::FieldNotFound { id: id.to_string() })
    }

    fn check_key_free(&self, key: &str, except: Option<&FieldId>) -> Result<()> {
        let taken = self
            .fields
            .values()
            .any(|f| Some(&f.id) != except && keys_equal(&f.key, key));
        if taken {
            Err(Error::DuplicateKey {
                key: key.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Append a field at the end of the order, checking its default value
    /// against the default limits.
    ///
    /// Adding a field marked as title clears the flag on every other field.
    pub fn add_field(&self, field: Field) -> Result<Schema> {
        self.add_field_with(field, &FieldTypeRegistry::default())
    }

    /// Append a field, checking its default value with `registry`.
    ///
    /// Use this with [`Settings::registry`](crate::settings::Settings::registry)
    /// so configured limits apply to defaults too.
    pub fn add_field_with(&self, field: Field, registry: &FieldTypeRegistry) -> Result<Schema> {
        if !self.kind.allows(field.kind()) {
            return Err(Error::FieldKindNotAllowed {
                kind: field.kind().to_string(),
                schema_kind: self.kind.to_string(),
            });
        }

        field.validate(registry)?;

        if self.contains(&field.id) {
            return Err(Error::InvalidConstraint(format!(
                "field id {} already exists in schema {}",
                field.id, self.id
            )));
        }
        self.check_key_free(&field.key, None)?;

        let mut next = self.clone();
        if field.is_title {
            for other in next.fields.values_mut() {
                other.is_title = false;
            }
        }
        debug!(schema_id = %self.id, field_id = %field.id, key = %field.key, "field added");
        next.fields.insert(field.id.clone(), field);
        Ok(next)
    }

    /// Remove a field.
    ///
    /// Values stored on items for this field are not touched; the item read
    /// path ignores them (see `Item::orphaned_values`).
    pub fn remove_field(&self, id: &FieldId) -> Result<Schema> {
        self.require(id)?;
        let mut next = self.clone();
        next.fields.shift_remove(id);
        debug!(schema_id = %self.id, field_id = %id, "field removed");
        Ok(next)
    }

    /// Reorder fields; `ids` must be a permutation of the current field ids
    pub fn reorder(&self, ids: &[FieldId]) -> Result<Schema> {
        if ids.len() != self.fields.len() {
            return Err(Error::OrderMismatch(format!(
                "expected {} field ids, got {}",
                self.fields.len(),
                ids.len()
            )));
        }

        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            if !self.contains(id) {
                return Err(Error::OrderMismatch(format!("unknown field id {}", id)));
            }
            if !seen.insert(id) {
                return Err(Error::OrderMismatch(format!("field id {} listed twice", id)));
            }
        }

        let mut next = self.clone();
        next.fields = ids
            .iter()
            .filter_map(|id| self.fields.get(id).map(|f| (id.clone(), f.clone())))
            .collect();
        debug!(schema_id = %self.id, "fields reordered");
        Ok(next)
    }

    /// Make a field the title field, clearing the flag everywhere else
    pub fn set_title_field(&self, id: &FieldId) -> Result<Schema> {
        self.require(id)?;
        let mut next = self.clone();
        for field in next.fields.values_mut() {
            field.is_title = &field.id == id;
        }
        debug!(schema_id = %self.id, field_id = %id, "title field set");
        Ok(next)
    }

    /// Clear the title flag on every field
    pub fn clear_title_field(&self) -> Schema {
        let mut next = self.clone();
        for field in next.fields.values_mut() {
            field.is_title = false;
        }
        next
    }

    /// Change a field's title.
    ///
    /// While the key still follows the title, it is re-derived from the new
    /// title. A title from which no key can be derived keeps the old key.
    pub fn rename_field(&self, id: &FieldId, title: impl Into<String>) -> Result<Schema> {
        let title = title.into();
        let field = self.require(id)?;

        let new_key = if field.key_customized {
            None
        } else {
            derive_key(&title)
        };
        if let Some(ref key) = new_key {
            self.check_key_free(key, Some(id))?;
        }

        let mut next = self.clone();
        if let Some(field) = next.fields.get_mut(id) {
            field.title = title;
            if let Some(key) = new_key {
                field.key = key;
            }
            debug!(schema_id = %self.id, field_id = %id, key = %field.key, "field renamed");
        }
        Ok(next)
    }

    /// Set a field's key by hand.
    ///
    /// A key that differs from the one derived from the title stops key
    /// derivation for this field permanently.
    pub fn set_field_key(&self, id: &FieldId, key: impl Into<String>) -> Result<Schema> {
        let key = key.into();
        let field = self.require(id)?;
        validate_key(&key)?;
        self.check_key_free(&key, Some(id))?;

        let diverged = derive_key(&field.title).as_deref() != Some(key.as_str());

        let mut next = self.clone();
        if let Some(field) = next.fields.get_mut(id) {
            field.key_customized = field.key_customized || diverged;
            field.key = key;
            debug!(schema_id = %self.id, field_id = %id, key = %field.key, "field key set");
        }
        Ok(next)
    }
}

// =============================================================================
// Model
// =============================================================================

/// A content model: its schema plus an optional metadata schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Model id
    pub id: ModelId,
    /// Model key
    pub key: String,
    /// Display name
    pub name: String,
    /// Content schema
    pub schema: Schema,
    /// Metadata schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_schema: Option<Schema>,
}

impl Model {
    /// Create a model with an empty content schema
    pub fn new(id: ModelId, key: impl Into<String>, name: impl Into<String>, schema_id: SchemaId) -> Self {
        Self {
            id,
            key: key.into(),
            name: name.into(),
            schema: Schema::new(schema_id, SchemaKind::Content),
            metadata_schema: None,
        }
    }

    /// Attach a metadata schema
    pub fn with_metadata_schema(mut self, schema: Schema) -> Result<Self> {
        if schema.kind() != SchemaKind::Metadata {
            return Err(Error::SchemaMismatch {
                expected: SchemaKind::Metadata.to_string(),
                found: schema.kind().to_string(),
            });
        }
        self.metadata_schema = Some(schema);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Scalar;
    use serde_json::json;

    fn fid(s: &str) -> FieldId {
        FieldId::from(s)
    }

    fn base() -> Schema {
        Schema::new(SchemaId::from("s1"), SchemaKind::Content)
            .add_field(Field::new(fid("f1"), "Title", FieldType::text()).title())
            .unwrap()
            .add_field(Field::new(fid("f2"), "Body", FieldType::MarkdownText { max_length: None }))
            .unwrap()
    }

    #[test]
    fn test_add_field_appends() {
        let schema = base()
            .add_field(Field::new(fid("f3"), "Price", FieldType::number(Some(0.0), None)))
            .unwrap();
        assert_eq!(schema.order(), vec![fid("f1"), fid("f2"), fid("f3")]);
        assert_eq!(schema.field(&fid("f3")).unwrap().key, "price");
    }

    #[test]
    fn test_duplicate_key_case_insensitive() {
        let schema = base();
        let err = schema
            .add_field(Field::new(fid("f9"), "Other", FieldType::text()).with_key("title"))
            .unwrap_err();
        assert_eq!(err, Error::DuplicateKey { key: "title".into() });
        assert_eq!(schema, base());
    }

    #[test]
    fn test_invalid_key() {
        let err = base()
            .add_field(Field::new(fid("f9"), "X", FieldType::text()).with_key("Bad Key"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidKey { .. }));

        let err = base()
            .add_field(Field::new(fid("f9"), "???", FieldType::text()))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidKey { .. }));
    }

    #[test]
    fn test_add_title_field_takes_over() {
        let schema = base()
            .add_field(Field::new(fid("f3"), "Name", FieldType::text()).title())
            .unwrap();
        let titles: Vec<_> = schema.fields().filter(|f| f.is_title).map(|f| f.id.clone()).collect();
        assert_eq!(titles, vec![fid("f3")]);
    }

    #[test]
    fn test_add_field_checks_constraints_and_default() {
        assert!(matches!(
            base().add_field(Field::new(fid("f3"), "N", FieldType::integer(Some(5), Some(1)))),
            Err(Error::InvalidConstraint(_))
        ));

        let bad_default = Field::new(fid("f3"), "N", FieldType::integer(Some(0), Some(10)))
            .with_default(FieldData::Single(Scalar::Integer(99)));
        assert!(matches!(base().add_field(bad_default), Err(Error::InvalidConstraint(_))));

        let good_default = Field::new(fid("f3"), "N", FieldType::integer(Some(0), Some(10)))
            .with_default(FieldData::Single(Scalar::Integer(3)));
        assert!(base().add_field(good_default).is_ok());
    }

    #[test]
    fn test_metadata_schema_restricts_kinds() {
        let meta = Schema::new(SchemaId::from("m"), SchemaKind::Metadata);
        assert!(meta.add_field(Field::new(fid("a"), "Reviewed", FieldType::Bool)).is_ok());
        assert!(matches!(
            meta.add_field(Field::new(fid("b"), "Count", FieldType::integer(None, None))),
            Err(Error::FieldKindNotAllowed { .. })
        ));
    }

    #[test]
    fn test_reorder_requires_permutation() {
        let schema = base();
        let reordered = schema.reorder(&[fid("f2"), fid("f1")]).unwrap();
        assert_eq!(reordered.order(), vec![fid("f2"), fid("f1")]);

        assert!(matches!(schema.reorder(&[fid("f1")]), Err(Error::OrderMismatch(_))));
        assert!(matches!(
            schema.reorder(&[fid("f1"), fid("f1")]),
            Err(Error::OrderMismatch(_))
        ));
        assert!(matches!(
            schema.reorder(&[fid("f1"), fid("zz")]),
            Err(Error::OrderMismatch(_))
        ));
    }

    #[test]
    fn test_remove_field() {
        let schema = base().remove_field(&fid("f1")).unwrap();
        assert_eq!(schema.order(), vec![fid("f2")]);
        assert!(schema.title_field().is_none());
        assert!(matches!(
            schema.remove_field(&fid("f1")),
            Err(Error::FieldNotFound { .. })
        ));
    }

    #[test]
    fn test_set_title_field() {
        let schema = base().set_title_field(&fid("f2")).unwrap();
        assert_eq!(schema.title_field().unwrap().id, fid("f2"));
        assert_eq!(schema.fields().filter(|f| f.is_title).count(), 1);
        assert!(matches!(
            schema.set_title_field(&fid("nope")),
            Err(Error::FieldNotFound { .. })
        ));
        assert!(schema.clear_title_field().title_field().is_none());
    }

    #[test]
    fn test_rename_rederives_key_until_customized() {
        let schema = base().rename_field(&fid("f2"), "Main Text").unwrap();
        assert_eq!(schema.field(&fid("f2")).unwrap().key, "main-text");

        let schema = schema.set_field_key(&fid("f2"), "content").unwrap();
        assert!(schema.field(&fid("f2")).unwrap().key_customized);

        let schema = schema.rename_field(&fid("f2"), "Article Body").unwrap();
        let field = schema.field(&fid("f2")).unwrap();
        assert_eq!(field.title, "Article Body");
        assert_eq!(field.key, "content");

        // Even setting the key back to the derived slug keeps derivation off.
        let schema = schema.set_field_key(&fid("f2"), "article-body").unwrap();
        let schema = schema.rename_field(&fid("f2"), "Something Else").unwrap();
        assert_eq!(schema.field(&fid("f2")).unwrap().key, "article-body");
    }

    #[test]
    fn test_decoded_hand_set_key_survives_rename() {
        let raw = json!({
            "id": "s1",
            "fields": [
                {"id": "f1", "key": "content", "title": "Body", "typeProperty": {"type": "Text"}},
                {"id": "f2", "key": "summary", "title": "Summary", "typeProperty": {"type": "Text"}}
            ]
        });
        let schema: Schema = serde_json::from_value(raw).unwrap();
        assert!(schema.field(&fid("f1")).unwrap().key_customized);
        assert!(!schema.field(&fid("f2")).unwrap().key_customized);

        let schema = schema.rename_field(&fid("f1"), "Article").unwrap();
        assert_eq!(schema.field(&fid("f1")).unwrap().key, "content");

        let schema = schema.rename_field(&fid("f2"), "Teaser").unwrap();
        assert_eq!(schema.field(&fid("f2")).unwrap().key, "teaser");
    }

    #[test]
    fn test_add_field_with_applies_configured_limits() {
        use crate::limits::Limits;

        let tight = FieldTypeRegistry::new(Limits {
            max_multiple_values: 1,
            ..Limits::default()
        });
        let scores = || {
            Field::new(fid("f3"), "Scores", FieldType::integer(None, None))
                .multiple()
                .with_default(FieldData::Multiple(vec![Scalar::Integer(1), Scalar::Integer(2)]))
        };

        assert!(base().add_field(scores()).is_ok());
        assert!(base().add_field_with(scores(), &FieldTypeRegistry::default()).is_ok());
        assert!(matches!(
            base().add_field_with(scores(), &tight),
            Err(Error::InvalidConstraint(_))
        ));
    }

    #[test]
    fn test_set_key_matching_derivation_keeps_auto() {
        let schema = base().set_field_key(&fid("f2"), "body").unwrap();
        assert!(!schema.field(&fid("f2")).unwrap().key_customized);
    }

    #[test]
    fn test_rename_conflict_is_rejected() {
        let schema = base();
        assert_eq!(
            schema.rename_field(&fid("f2"), "Title").unwrap_err(),
            Error::DuplicateKey { key: "title".into() }
        );
    }

    #[test]
    fn test_serde_round_trip_keeps_order() {
        let schema = base().reorder(&[fid("f2"), fid("f1")]).unwrap();
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["fields"][0]["id"], "f2");
        assert_eq!(json["fields"][1]["typeProperty"]["type"], "Text");
        let parsed: Schema = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, schema);
    }

    #[test]
    fn test_deserialize_rejects_duplicate_keys() {
        let raw = json!({
            "id": "s1",
            "fields": [
                {"id": "a", "key": "name", "title": "Name", "typeProperty": {"type": "Text"}},
                {"id": "b", "key": "NAME", "title": "Name", "typeProperty": {"type": "Text"}}
            ]
        });
        assert!(serde_json::from_value::<Schema>(raw).is_err());
    }

    #[test]
    fn test_model_metadata_schema_kind() {
        let model = Model::new(ModelId::from("m"), "blog", "Blog", SchemaId::from("s"));
        assert!(model
            .clone()
            .with_metadata_schema(Schema::new(SchemaId::from("x"), SchemaKind::Content))
            .is_err());
        assert!(model
            .with_metadata_schema(Schema::new(SchemaId::from("x"), SchemaKind::Metadata))
            .is_ok());
    }
}
