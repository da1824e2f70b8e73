//! Versioned content items
//!
//! An [`Item`] is a graph of [`ItemVersion`]s plus named refs into it.
//! `latest` always points at the working version; `published` only moves
//! through an approved request or a direct publish without review gate.
//! Every operation returns a new snapshot; the receiver is left untouched.

use crate::error::{Error, Result, ValidationError};
use crate::fields::{FieldData, FieldKind, FieldTypeRegistry, Scalar};
use crate::ids::{FieldId, ItemGroupId, ItemId, ModelId, SchemaId, UserId, Version};
use crate::multiple::move_item;
use crate::request::Request;
use crate::schema::{Field, Model, Schema, SchemaKind};
use crate::settings::Settings;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};

// =============================================================================
// Refs
// =============================================================================

/// Name of a ref into the version graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefName {
    /// The working version
    Latest,
    /// The publicly visible version
    Published,
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefName::Latest => f.write_str("latest"),
            RefName::Published => f.write_str("published"),
        }
    }
}

/// Named pointers to item versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refs {
    /// Always present
    pub latest: Version,
    /// Present once a version was published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<Version>,
}

impl Refs {
    /// Resolve a ref by name
    pub fn get(&self, name: RefName) -> Option<&Version> {
        match name {
            RefName::Latest => Some(&self.latest),
            RefName::Published => self.published.as_ref(),
        }
    }

    /// Names of every ref pointing at `version`
    pub fn names_of(&self, version: &Version) -> Vec<RefName> {
        let mut names = Vec::new();
        if &self.latest == version {
            names.push(RefName::Latest);
        }
        if self.published.as_ref() == Some(version) {
            names.push(RefName::Published);
        }
        names
    }
}

// =============================================================================
// Values and versions
// =============================================================================

/// Stored value of one field on one item version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValue {
    /// Field the value belongs to
    pub schema_field_id: FieldId,
    /// Field type at write time
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// The value; `None` means unset
    #[serde(default)]
    pub value: Option<FieldData>,
    /// Group instance for fields of a repeatable group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_group_id: Option<ItemGroupId>,
}

impl FieldValue {
    fn is_for(&self, field_id: &FieldId, group: Option<&ItemGroupId>) -> bool {
        &self.schema_field_id == field_id && self.item_group_id.as_ref() == group
    }
}

/// One node of the version graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemVersion {
    /// Version token
    pub version: Version,
    /// Versions this one was derived from
    #[serde(default)]
    pub parents: BTreeSet<Version>,
    /// Field values
    #[serde(default)]
    pub fields: Vec<FieldValue>,
    /// Author of the version
    pub created_by: UserId,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Set once the version was published or submitted for review; a
    /// sealed version never changes again
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sealed: bool,
}

/// Metadata values, versioned independently of content
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMetadata {
    /// Token of the last metadata write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    /// Metadata field values
    #[serde(default)]
    pub fields: Vec<FieldValue>,
}

/// A raw value for one field, as supplied by an editor form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInput {
    /// Target field
    pub schema_field_id: FieldId,
    /// Raw value
    #[serde(default)]
    pub value: JsonValue,
    /// Group instance, for fields of a repeatable group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_group_id: Option<ItemGroupId>,
}

impl FieldInput {
    /// Input for a top-level field
    pub fn new(schema_field_id: impl Into<FieldId>, value: JsonValue) -> Self {
        Self {
            schema_field_id: schema_field_id.into(),
            value,
            item_group_id: None,
        }
    }

    /// Input for a field of a repeatable group instance
    pub fn in_group(mut self, item_group_id: impl Into<ItemGroupId>) -> Self {
        self.item_group_id = Some(item_group_id.into());
        self
    }
}

/// A schema field paired with the stored value, for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct FieldView<'a> {
    /// The field definition
    pub field: &'a Field,
    /// The stored value, if set
    pub value: Option<&'a FieldData>,
}

// =============================================================================
// Item
// =============================================================================

/// Raw item payload, checked before it becomes an [`Item`]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemRepr {
    id: ItemId,
    model_id: ModelId,
    schema_id: SchemaId,
    #[serde(default)]
    metadata_schema_id: Option<SchemaId>,
    versions: IndexMap<Version, ItemVersion>,
    refs: Refs,
    #[serde(default)]
    metadata: ItemMetadata,
    created_by: UserId,
    updated_by: Option<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    thread_id: Option<String>,
}

/// One version of an item as the transport layer ships it: the version's
/// own values plus the names of the refs pointing at it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    /// Item id
    pub id: ItemId,
    /// Model the item belongs to
    pub model_id: ModelId,
    /// Content schema
    pub schema_id: SchemaId,
    /// Metadata schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_schema_id: Option<SchemaId>,
    /// Token of this version
    pub version: Version,
    /// Versions this one was derived from
    #[serde(default)]
    pub parents: BTreeSet<Version>,
    /// Refs pointing at this version
    pub refs: BTreeSet<RefName>,
    /// Field values of this version
    #[serde(default)]
    pub fields: Vec<FieldValue>,
    /// Metadata bag
    #[serde(default)]
    pub metadata: ItemMetadata,
    /// Creator
    pub created_by: UserId,
    /// Author of the last edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<UserId>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Time of the last edit
    pub updated_at: DateTime<Utc>,
    /// Comment thread id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Either payload shape an item decodes from
#[derive(Deserialize)]
#[serde(untagged)]
enum ItemPayload {
    Graph(ItemRepr),
    Record(ItemRecord),
}

/// A versioned content record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ItemPayload")]
pub struct Item {
    id: ItemId,
    model_id: ModelId,
    schema_id: SchemaId,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata_schema_id: Option<SchemaId>,
    versions: IndexMap<Version, ItemVersion>,
    refs: Refs,
    metadata: ItemMetadata,
    created_by: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_by: Option<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_id: Option<String>,
}

impl TryFrom<ItemRepr> for Item {
    type Error = Error;

    fn try_from(repr: ItemRepr) -> Result<Self> {
        let missing = |version: &Version| Error::VersionNotFound {
            item: repr.id.to_string(),
            version: version.to_string(),
        };

        // Parents may name versions outside the loaded history.
        for (token, node) in &repr.versions {
            if token != &node.version {
                return Err(Error::InvalidConstraint(format!(
                    "version {} is stored under token {}",
                    node.version, token
                )));
            }
        }
        if !repr.versions.contains_key(&repr.refs.latest) {
            return Err(missing(&repr.refs.latest));
        }
        if let Some(ref published) = repr.refs.published {
            if !repr.versions.contains_key(published) {
                return Err(missing(published));
            }
        }

        Ok(Item {
            id: repr.id,
            model_id: repr.model_id,
            schema_id: repr.schema_id,
            metadata_schema_id: repr.metadata_schema_id,
            versions: repr.versions,
            refs: repr.refs,
            metadata: repr.metadata,
            created_by: repr.created_by,
            updated_by: repr.updated_by,
            created_at: repr.created_at,
            updated_at: repr.updated_at,
            thread_id: repr.thread_id,
        })
    }
}

impl TryFrom<ItemRecord> for Item {
    type Error = Error;

    fn try_from(record: ItemRecord) -> Result<Self> {
        if !record.refs.contains(&RefName::Latest) {
            return Err(Error::InvalidConstraint(format!(
                "record of item {} at version {} is not the latest version",
                record.id, record.version
            )));
        }
        let published = record.refs.contains(&RefName::Published);
        let node = ItemVersion {
            version: record.version.clone(),
            parents: record.parents,
            fields: record.fields,
            created_by: record.updated_by.clone().unwrap_or_else(|| record.created_by.clone()),
            created_at: record.updated_at,
            sealed: published,
        };

        let mut versions = IndexMap::new();
        versions.insert(record.version.clone(), node);

        Ok(Item {
            id: record.id,
            model_id: record.model_id,
            schema_id: record.schema_id,
            metadata_schema_id: record.metadata_schema_id,
            versions,
            refs: Refs {
                latest: record.version.clone(),
                published: published.then_some(record.version),
            },
            metadata: record.metadata,
            created_by: record.created_by,
            updated_by: record.updated_by,
            created_at: record.created_at,
            updated_at: record.updated_at,
            thread_id: record.thread_id,
        })
    }
}

impl TryFrom<ItemPayload> for Item {
    type Error = Error;

    fn try_from(payload: ItemPayload) -> Result<Self> {
        match payload {
            ItemPayload::Graph(repr) => Item::try_from(repr),
            ItemPayload::Record(record) => Item::try_from(record),
        }
    }
}

impl Item {
    /// Create an item with an empty root version
    pub fn new(id: ItemId, model: &Model, author: UserId, now: DateTime<Utc>) -> Self {
        let version = Version::generate();
        let root = ItemVersion {
            version: version.clone(),
            parents: BTreeSet::new(),
            fields: Vec::new(),
            created_by: author.clone(),
            created_at: now,
            sealed: false,
        };

        debug!(item_id = %id, model_id = %model.id, version = %version, "item created");

        let mut versions = IndexMap::new();
        versions.insert(version.clone(), root);

        Self {
            id,
            model_id: model.id.clone(),
            schema_id: model.schema.id().clone(),
            metadata_schema_id: model.metadata_schema.as_ref().map(|s| s.id().clone()),
            versions,
            refs: Refs {
                latest: version,
                published: None,
            },
            metadata: ItemMetadata::default(),
            created_by: author,
            updated_by: None,
            created_at: now,
            updated_at: now,
            thread_id: None,
        }
    }

    /// Attach a comment thread
    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    /// Item id
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    /// Model the item belongs to
    pub fn model_id(&self) -> &ModelId {
        &self.model_id
    }

    /// Content schema the values conform to
    pub fn schema_id(&self) -> &SchemaId {
        &self.schema_id
    }

    /// Metadata schema, if the model has one
    pub fn metadata_schema_id(&self) -> Option<&SchemaId> {
        self.metadata_schema_id.as_ref()
    }

    /// Refs into the version graph
    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    /// Token of the working version
    pub fn latest_version(&self) -> &Version {
        &self.refs.latest
    }

    /// Token of the published version
    pub fn published_version(&self) -> Option<&Version> {
        self.refs.published.as_ref()
    }

    /// Whether the working version differs from the published one
    pub fn has_newer_draft(&self) -> bool {
        match self.refs.published {
            Some(ref published) => published != &self.refs.latest,
            None => false,
        }
    }

    /// Look up a version node
    pub fn version(&self, version: &Version) -> Option<&ItemVersion> {
        self.versions.get(version)
    }

    /// Version nodes in creation order
    pub fn versions(&self) -> impl Iterator<Item = &ItemVersion> {
        self.versions.values()
    }

    /// Field values of the working version
    pub fn fields(&self) -> &[FieldValue] {
        &self.head().fields
    }

    /// Metadata bag
    pub fn metadata(&self) -> &ItemMetadata {
        &self.metadata
    }

    /// Creator
    pub fn created_by(&self) -> &UserId {
        &self.created_by
    }

    /// Author of the last edit
    pub fn updated_by(&self) -> Option<&UserId> {
        self.updated_by.as_ref()
    }

    /// Creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last edit
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Comment thread id
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// The working version in the single-version record shape
    pub fn to_record(&self) -> ItemRecord {
        let head = self.head();
        ItemRecord {
            id: self.id.clone(),
            model_id: self.model_id.clone(),
            schema_id: self.schema_id.clone(),
            metadata_schema_id: self.metadata_schema_id.clone(),
            version: head.version.clone(),
            parents: head.parents.clone(),
            refs: self.refs.names_of(&head.version).into_iter().collect(),
            fields: head.fields.clone(),
            metadata: self.metadata.clone(),
            created_by: self.created_by.clone(),
            updated_by: self.updated_by.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            thread_id: self.thread_id.clone(),
        }
    }

    // `refs.latest` is always a key of `versions`: checked on decode and
    // maintained by every constructor and mutator.
    fn head(&self) -> &ItemVersion {
        &self.versions[&self.refs.latest]
    }

    /// The working version, if it may still be written in place
    fn writable_head(&mut self) -> Result<&mut ItemVersion> {
        if !self.is_writable() {
            return Err(Error::VersionSealed {
                item: self.id.to_string(),
                version: self.refs.latest.to_string(),
            });
        }
        let latest = self.refs.latest.clone();
        Ok(&mut self.versions[&latest])
    }

    fn require_version(&self, version: &Version) -> Result<&ItemVersion> {
        self.versions.get(version).ok_or_else(|| Error::VersionNotFound {
            item: self.id.to_string(),
            version: version.to_string(),
        })
    }

    fn check_content_schema(&self, schema: &Schema, group: Option<&ItemGroupId>) -> Result<()> {
        match schema.kind() {
            SchemaKind::Content => {
                if schema.id() != &self.schema_id {
                    return Err(Error::SchemaMismatch {
                        expected: self.schema_id.to_string(),
                        found: schema.id().to_string(),
                    });
                }
                if group.is_some() {
                    return Err(ValidationError::new(
                        "itemGroupId is only allowed for fields of a group",
                    )
                    .into());
                }
            }
            SchemaKind::Group => {
                if group.is_none() {
                    return Err(ValidationError::new("fields of a group need an itemGroupId").into());
                }
            }
            SchemaKind::Metadata => {
                return Err(Error::SchemaMismatch {
                    expected: "content or group schema".to_string(),
                    found: schema.kind().to_string(),
                });
            }
        }
        Ok(())
    }

    fn write_field(
        &mut self,
        schema: &Schema,
        registry: &FieldTypeRegistry,
        field_id: &FieldId,
        raw: &JsonValue,
        group: Option<&ItemGroupId>,
    ) -> Result<()> {
        self.check_content_schema(schema, group)?;
        let field = schema
            .field(field_id)
            .ok_or_else(|| Error::FieldNotFound { id: field_id.to_string() })?;
        let value = registry.coerce_field(field, raw)?;
        store(&mut self.writable_head()?.fields, field, value, group);
        Ok(())
    }

    /// Coerce and store a raw value in the working version.
    ///
    /// A value that normalizes to unset removes the stored entry. On any
    /// error the returned `Err` carries no partial write. Fails with
    /// [`Error::VersionSealed`] when the working version is published or
    /// under review; use [`Item::edit`] to branch a new version instead.
    pub fn set_field_value(
        &self,
        schema: &Schema,
        registry: &FieldTypeRegistry,
        field_id: &FieldId,
        raw: &JsonValue,
        item_group_id: Option<&ItemGroupId>,
    ) -> Result<Item> {
        let mut next = self.clone();
        next.write_field(schema, registry, field_id, raw, item_group_id)?;
        debug!(item_id = %self.id, field_id = %field_id, "field value set");
        Ok(next)
    }

    /// Apply several inputs at once; the first failure rejects them all.
    ///
    /// Each input is resolved against the first schema containing its field.
    pub fn apply(
        &self,
        schemas: &[&Schema],
        registry: &FieldTypeRegistry,
        inputs: &[FieldInput],
    ) -> Result<Item> {
        let mut next = self.clone();
        for input in inputs {
            let schema = find_schema(schemas, &input.schema_field_id)?;
            next.write_field(
                schema,
                registry,
                &input.schema_field_id,
                &input.value,
                input.item_group_id.as_ref(),
            )?;
        }
        debug!(item_id = %self.id, count = inputs.len(), "inputs applied");
        Ok(next)
    }

    /// Derive a new working version from `base`.
    ///
    /// The new version copies the values of `base`, records it as its only
    /// parent and takes over the `latest` ref. No other ref moves.
    pub fn create_version(&self, base: &Version, author: &UserId, now: DateTime<Utc>) -> Result<Item> {
        let base_node = self.require_version(base)?;
        let version = Version::generate();
        let node = ItemVersion {
            version: version.clone(),
            parents: BTreeSet::from([base.clone()]),
            fields: base_node.fields.clone(),
            created_by: author.clone(),
            created_at: now,
            sealed: false,
        };

        let mut next = self.clone();
        next.versions.insert(version.clone(), node);
        next.refs.latest = version;
        next.updated_by = Some(author.clone());
        next.updated_at = now;
        debug!(item_id = %self.id, base = %base, version = %next.refs.latest, "version created");
        Ok(next)
    }

    /// Record an edit: a new version on top of `latest` with `inputs` applied
    pub fn edit(
        &self,
        schemas: &[&Schema],
        registry: &FieldTypeRegistry,
        inputs: &[FieldInput],
        author: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Item> {
        self.create_version(&self.refs.latest, author, now)?
            .apply(schemas, registry, inputs)
    }

    /// Coerce and store a metadata value; bumps the metadata version
    pub fn set_metadata_value(
        &self,
        schema: &Schema,
        registry: &FieldTypeRegistry,
        field_id: &FieldId,
        raw: &JsonValue,
    ) -> Result<Item> {
        if schema.kind() != SchemaKind::Metadata {
            return Err(Error::SchemaMismatch {
                expected: SchemaKind::Metadata.to_string(),
                found: schema.kind().to_string(),
            });
        }
        if let Some(ref expected) = self.metadata_schema_id {
            if expected != schema.id() {
                return Err(Error::SchemaMismatch {
                    expected: expected.to_string(),
                    found: schema.id().to_string(),
                });
            }
        }

        let field = schema
            .field(field_id)
            .ok_or_else(|| Error::FieldNotFound { id: field_id.to_string() })?;
        let value = registry.coerce_field(field, raw)?;

        let mut next = self.clone();
        store(&mut next.metadata.fields, field, value, None);
        next.metadata.version = Some(Version::generate());
        debug!(item_id = %self.id, field_id = %field_id, "metadata value set");
        Ok(next)
    }

    /// Move one element of a stored multi-value within its list.
    ///
    /// # Panics
    ///
    /// Panics if `from` or `to` is out of range for the stored list.
    pub fn move_value(
        &self,
        field_id: &FieldId,
        item_group_id: Option<&ItemGroupId>,
        from: usize,
        to: usize,
    ) -> Result<Item> {
        let mut next = self.clone();
        let entry = next
            .writable_head()?
            .fields
            .iter_mut()
            .find(|v| v.is_for(field_id, item_group_id))
            .ok_or_else(|| Error::FieldNotFound { id: field_id.to_string() })?;

        match entry.value {
            Some(FieldData::Multiple(ref mut values)) => {
                *values = move_item(values, from, to);
            }
            _ => {
                return Err(ValidationError::new("stored value is not a list")
                    .with_field(field_id.as_str())
                    .into())
            }
        }
        Ok(next)
    }

    /// Point `published` at `version` without review.
    ///
    /// Only allowed when the settings configure no review gate; otherwise
    /// publication goes through an approved request.
    pub fn publish(&self, version: &Version, settings: &Settings) -> Result<Item> {
        if settings.require_review {
            return Err(Error::ReviewRequired {
                item: self.id.to_string(),
            });
        }
        self.set_published(version)
    }

    pub(crate) fn set_published(&self, version: &Version) -> Result<Item> {
        let mut next = self.seal(version)?;
        next.refs.published = Some(version.clone());
        debug!(item_id = %self.id, version = %version, "published ref moved");
        Ok(next)
    }

    /// Freeze `version` so no in-place write can change it again.
    ///
    /// Call this for every version put into a review request. Publishing
    /// seals the published version.
    pub fn seal(&self, version: &Version) -> Result<Item> {
        self.require_version(version)?;
        let mut next = self.clone();
        let node = &mut next.versions[version];
        if !node.sealed {
            node.sealed = true;
            debug!(item_id = %self.id, version = %version, "version sealed");
        }
        Ok(next)
    }

    /// Seal every version of this item an open request references
    pub fn seal_requested(&self, requests: &[Request]) -> Item {
        let mut next = self.clone();
        for request in requests.iter().filter(|r| r.is_open()) {
            if let Some(entry) = request.references(&self.id) {
                if let Some(node) = next.versions.get_mut(&entry.version) {
                    node.sealed = true;
                }
            }
        }
        next
    }

    /// Whether the working version may still be written in place
    pub fn is_writable(&self) -> bool {
        !self.head().sealed && self.refs.published.as_ref() != Some(&self.refs.latest)
    }

    // -------------------------------------------------------------------------
    // Read path
    // -------------------------------------------------------------------------

    /// Stored value of a field in the working version
    pub fn value_of(&self, field_id: &FieldId, item_group_id: Option<&ItemGroupId>) -> Option<&FieldData> {
        self.fields()
            .iter()
            .find(|v| v.is_for(field_id, item_group_id))
            .and_then(|v| v.value.as_ref())
    }

    /// Stored metadata value of a field
    pub fn metadata_value_of(&self, field_id: &FieldId) -> Option<&FieldData> {
        self.metadata
            .fields
            .iter()
            .find(|v| &v.schema_field_id == field_id)
            .and_then(|v| v.value.as_ref())
    }

    /// Schema fields in order, each with its stored value.
    ///
    /// Stored values whose field no longer exists are ignored.
    pub fn view<'a>(&'a self, schema: &'a Schema, item_group_id: Option<&ItemGroupId>) -> Vec<FieldView<'a>> {
        let orphans = self
            .fields()
            .iter()
            .filter(|v| v.item_group_id.as_ref() == item_group_id && !schema.contains(&v.schema_field_id))
            .count();
        if orphans > 0 {
            warn!(item_id = %self.id, schema_id = %schema.id(), orphans, "skipping values of deleted fields");
        }

        schema
            .fields()
            .map(|field| FieldView {
                field,
                value: self.value_of(&field.id, item_group_id),
            })
            .collect()
    }

    /// Values in the working version whose field exists in none of `schemas`
    pub fn orphaned_values(&self, schemas: &[&Schema]) -> Vec<&FieldValue> {
        self.fields()
            .iter()
            .filter(|v| !schemas.iter().any(|s| s.contains(&v.schema_field_id)))
            .collect()
    }

    /// Drop orphaned values from the working version
    pub fn prune_orphans(&self, schemas: &[&Schema]) -> Result<Item> {
        if self.orphaned_values(schemas).is_empty() {
            return Ok(self.clone());
        }
        let mut next = self.clone();
        let fields = &mut next.writable_head()?.fields;
        let before = fields.len();
        fields.retain(|v| schemas.iter().any(|s| s.contains(&v.schema_field_id)));
        debug!(item_id = %self.id, removed = before - fields.len(), "orphaned values pruned");
        Ok(next)
    }

    /// Display title taken from the schema's title field
    pub fn title(&self, schema: &Schema) -> Option<String> {
        let field = schema.title_field()?;
        match self.value_of(&field.id, None)? {
            FieldData::Single(scalar) => Some(scalar_label(scalar)),
            FieldData::Multiple(values) => values.first().map(scalar_label),
        }
    }

    /// One error per required top-level field without a value
    pub fn missing_required(&self, schema: &Schema) -> Vec<ValidationError> {
        schema
            .fields()
            .filter(|f| f.required && self.value_of(&f.id, None).is_none())
            .map(|f| {
                ValidationError::new("value is required")
                    .with_field(f.id.as_str())
                    .with_key(f.key.as_str())
            })
            .collect()
    }

    /// One error per unique field whose value another item already holds
    pub fn validate_unique(&self, schema: &Schema, others: &[Item]) -> Vec<ValidationError> {
        schema
            .fields()
            .filter(|f| f.unique)
            .filter_map(|f| {
                let value = self.value_of(&f.id, None)?;
                let clash = others
                    .iter()
                    .filter(|other| other.id != self.id)
                    .find(|other| other.value_of(&f.id, None) == Some(value))?;
                Some(
                    ValidationError::new("value must be unique")
                        .with_field(f.id.as_str())
                        .with_key(f.key.as_str())
                        .with_reason(format!("item {} holds the same value", clash.id)),
                )
            })
            .collect()
    }
}

fn store(values: &mut Vec<FieldValue>, field: &Field, value: Option<FieldData>, group: Option<&ItemGroupId>) {
    let position = values.iter().position(|v| v.is_for(&field.id, group));
    match (position, value) {
        (Some(i), Some(value)) => {
            values[i].value = Some(value);
            values[i].kind = field.kind();
        }
        (Some(i), None) => {
            values.remove(i);
        }
        (None, Some(value)) => values.push(FieldValue {
            schema_field_id: field.id.clone(),
            kind: field.kind(),
            value: Some(value),
            item_group_id: group.cloned(),
        }),
        (None, None) => {}
    }
}

fn find_schema<'a>(schemas: &[&'a Schema], field_id: &FieldId) -> Result<&'a Schema> {
    schemas
        .iter()
        .copied()
        .find(|s| s.contains(field_id))
        .ok_or_else(|| Error::FieldNotFound { id: field_id.to_string() })
}

fn scalar_label(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Text(s) => s.clone(),
        other => other.to_json().to_string(),
    }
}

/// Check every input and collect all errors instead of stopping at the first
pub fn validate_inputs(schemas: &[&Schema], registry: &FieldTypeRegistry, inputs: &[FieldInput]) -> Vec<Error> {
    inputs
        .iter()
        .filter_map(|input| {
            let schema = match find_schema(schemas, &input.schema_field_id) {
                Ok(schema) => schema,
                Err(err) => return Some(err),
            };
            let field = schema.field(&input.schema_field_id)?;
            if schema.kind() == SchemaKind::Group && input.item_group_id.is_none() {
                return Some(
                    ValidationError::new("fields of a group need an itemGroupId")
                        .with_field(field.id.as_str())
                        .with_key(field.key.as_str())
                        .into(),
                );
            }
            registry.coerce_field(field, &input.value).err()
        })
        .collect()
}
