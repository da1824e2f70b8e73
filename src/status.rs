//! Composite publish status of an item
//!
//! The status is derived, never stored. It combines three facts about an
//! item: whether it has a published version, whether an open request
//! references its working version, and whether that working version is
//! ahead of the published one.

use crate::item::Item;
use crate::request::Request;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Publish/review label of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// Never published, not under review
    Draft,
    /// Published and up to date
    Public,
    /// Never published, under review
    Review,
    /// Published, with changes under review
    PublicReview,
    /// Published, with unrequested newer changes
    PublicDraft,
}

impl ItemStatus {
    /// All statuses
    pub const ALL: [ItemStatus; 5] = [
        ItemStatus::Draft,
        ItemStatus::Public,
        ItemStatus::Review,
        ItemStatus::PublicReview,
        ItemStatus::PublicDraft,
    ];

    /// Get the status as its wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Draft => "DRAFT",
            ItemStatus::Public => "PUBLIC",
            ItemStatus::Review => "REVIEW",
            ItemStatus::PublicReview => "PUBLIC_REVIEW",
            ItemStatus::PublicDraft => "PUBLIC_DRAFT",
        }
    }

    /// Whether a version of the item is public
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            ItemStatus::Public | ItemStatus::PublicReview | ItemStatus::PublicDraft
        )
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The facts a status is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusFlags {
    /// The item carries a `published` ref
    pub has_published_ref: bool,
    /// A draft or waiting request references the item's working version
    pub has_open_request: bool,
    /// The working version is ahead of the published one
    pub has_newer_draft: bool,
}

impl StatusFlags {
    /// Collect the flags for `item` from the requests that may reference it.
    ///
    /// A request for a version older than `latest` does not count.
    pub fn of(item: &Item, requests: &[Request]) -> Self {
        Self {
            has_published_ref: item.published_version().is_some(),
            has_open_request: requests.iter().any(|r| {
                r.is_open()
                    && r.references(item.id()).map(|entry| &entry.version) == Some(item.latest_version())
            }),
            has_newer_draft: item.has_newer_draft(),
        }
    }
}

/// Map flags to a status.
///
/// An open request outranks a newer draft: the request is the more
/// specific state.
pub fn resolve_flags(flags: StatusFlags) -> ItemStatus {
    match (flags.has_published_ref, flags.has_open_request, flags.has_newer_draft) {
        (false, false, _) => ItemStatus::Draft,
        (false, true, _) => ItemStatus::Review,
        (true, true, _) => ItemStatus::PublicReview,
        (true, false, true) => ItemStatus::PublicDraft,
        (true, false, false) => ItemStatus::Public,
    }
}

/// Derive the status of `item`; requests not referencing it are ignored
pub fn resolve(item: &Item, requests: &[Request]) -> ItemStatus {
    resolve_flags(StatusFlags::of(item, requests))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldType;
    use crate::ids::{FieldId, ItemId, ModelId, RequestId, SchemaId, UserId};
    use crate::request::{NewRequest, RequestItem};
    use crate::schema::{Field, Model};
    use crate::settings::Settings;
    use chrono::{TimeZone, Utc};

    fn flags(published: bool, open: bool, newer: bool) -> StatusFlags {
        StatusFlags {
            has_published_ref: published,
            has_open_request: open,
            has_newer_draft: newer,
        }
    }

    #[test]
    fn test_truth_table() {
        assert_eq!(resolve_flags(flags(true, false, false)), ItemStatus::Public);
        assert_eq!(resolve_flags(flags(false, false, false)), ItemStatus::Draft);
        assert_eq!(resolve_flags(flags(false, true, false)), ItemStatus::Review);
        assert_eq!(resolve_flags(flags(false, true, true)), ItemStatus::Review);
        assert_eq!(resolve_flags(flags(true, true, false)), ItemStatus::PublicReview);
        assert_eq!(resolve_flags(flags(true, false, true)), ItemStatus::PublicDraft);
    }

    #[test]
    fn test_open_request_outranks_newer_draft() {
        assert_eq!(resolve_flags(flags(true, true, true)), ItemStatus::PublicReview);
    }

    #[test]
    fn test_every_combination_resolves() {
        for bits in 0..8u8 {
            let status = resolve_flags(flags(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0));
            assert!(ItemStatus::ALL.contains(&status));
            assert_eq!(status.is_public(), bits & 1 != 0);
        }
    }

    #[test]
    fn test_request_on_older_version_does_not_count() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let author = UserId::from("u1");
        let mut model = Model::new(ModelId::from("m1"), "post", "Post", SchemaId::from("s1"));
        model.schema = model
            .schema
            .add_field(Field::new(FieldId::from("title"), "Title", FieldType::text()))
            .unwrap();

        let item = Item::new(ItemId::from("i1"), &model, author.clone(), now);
        let request = Request::create(
            NewRequest {
                id: RequestId::from("r1"),
                title: "Review v1".to_string(),
                description: None,
                items: vec![RequestItem::latest_of(&item)],
                reviewers: vec![UserId::from("rev")],
                created_by: author.clone(),
                submit: true,
            },
            now,
        )
        .unwrap();
        let requests = [request];
        assert_eq!(resolve(&item, &requests), ItemStatus::Review);

        let v2 = item.create_version(item.latest_version(), &author, now).unwrap();
        assert_eq!(resolve(&v2, &requests), ItemStatus::Draft);

        let v1 = item.latest_version().clone();
        let published = item.publish(&v1, &Settings::without_review()).unwrap();
        let public_draft = published.create_version(&v1, &author, now).unwrap();
        assert_eq!(resolve(&published, &requests), ItemStatus::PublicReview);
        assert_eq!(resolve(&public_draft, &requests), ItemStatus::PublicDraft);
    }

    #[test]
    fn test_wire_names() {
        for status in ItemStatus::ALL {
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::String(status.as_str().to_string())
            );
        }
    }
}
