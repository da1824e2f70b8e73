//! Review requests
//!
//! A [`Request`] groups item versions for review. State machine:
//!
//! ```text
//! DRAFT ──submit──> WAITING ──approve──> APPROVED
//!   │                  │
//!   └──────close───────┴──────close────> CLOSED
//! ```
//!
//! `APPROVED` and `CLOSED` are terminal: every later transition fails with
//! [`Error::TerminalState`] and every content change with
//! [`Error::RequestLocked`].

use crate::error::{Error, Result};
use crate::ids::{ItemId, RequestId, UserId, Version};
use crate::item::{Item, RefName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Lifecycle state of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    /// Created, not yet submitted
    Draft,
    /// Submitted, awaiting review
    Waiting,
    /// Approved; referenced versions are published
    Approved,
    /// Closed without approval
    Closed,
}

impl RequestState {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Approved | RequestState::Closed)
    }

    /// Whether the request still counts as open for status purposes
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    /// Get the state as its wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Draft => "DRAFT",
            RequestState::Waiting => "WAITING",
            RequestState::Approved => "APPROVED",
            RequestState::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item version under review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestItem {
    /// Referenced item
    pub item_id: ItemId,
    /// Referenced version
    pub version: Version,
    /// Ref the version was taken from
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_name: Option<RefName>,
}

impl RequestItem {
    /// Reference `version` of `item_id`
    pub fn new(item_id: impl Into<ItemId>, version: impl Into<Version>) -> Self {
        Self {
            item_id: item_id.into(),
            version: version.into(),
            ref_name: None,
        }
    }

    /// Reference whatever `latest` currently points at
    pub fn latest_of(item: &Item) -> Self {
        Self {
            item_id: item.id().clone(),
            version: item.latest_version().clone(),
            ref_name: Some(RefName::Latest),
        }
    }
}

/// Parameters for creating a request
#[derive(Debug, Clone, PartialEq)]
pub struct NewRequest {
    /// Request id
    pub id: RequestId,
    /// Title
    pub title: String,
    /// Optional description
    pub description: Option<String>,
    /// Item versions to review
    pub items: Vec<RequestItem>,
    /// Assigned reviewers
    pub reviewers: Vec<UserId>,
    /// Creator
    pub created_by: UserId,
    /// Create directly in `WAITING` instead of `DRAFT`
    pub submit: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestRepr {
    id: RequestId,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    items: Vec<RequestItem>,
    #[serde(default)]
    reviewers: BTreeSet<UserId>,
    state: RequestState,
    created_by: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    closed_at: Option<DateTime<Utc>>,
}

/// A review request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RequestRepr")]
pub struct Request {
    id: RequestId,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    items: Vec<RequestItem>,
    reviewers: BTreeSet<UserId>,
    state: RequestState,
    created_by: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    closed_at: Option<DateTime<Utc>>,
}

impl TryFrom<RequestRepr> for Request {
    type Error = Error;

    fn try_from(repr: RequestRepr) -> Result<Self> {
        let consistent = match repr.state {
            RequestState::Approved => repr.approved_at.is_some(),
            RequestState::Closed => repr.closed_at.is_some(),
            RequestState::Draft | RequestState::Waiting => {
                repr.approved_at.is_none() && repr.closed_at.is_none()
            }
        };
        if !consistent {
            return Err(Error::InvalidConstraint(format!(
                "request {} in state {} has inconsistent timestamps",
                repr.id, repr.state
            )));
        }

        let mut items: Vec<RequestItem> = Vec::with_capacity(repr.items.len());
        for item in repr.items {
            upsert(&mut items, item);
        }

        Ok(Request {
            id: repr.id,
            title: repr.title,
            description: repr.description,
            items,
            reviewers: repr.reviewers,
            state: repr.state,
            created_by: repr.created_by,
            created_at: repr.created_at,
            updated_at: repr.updated_at,
            approved_at: repr.approved_at,
            closed_at: repr.closed_at,
        })
    }
}

fn upsert(items: &mut Vec<RequestItem>, item: RequestItem) {
    match items.iter_mut().find(|i| i.item_id == item.item_id) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

impl Request {
    /// Create a request in `DRAFT`, or in `WAITING` when `new.submit` is set.
    ///
    /// Later entries for the same item replace earlier ones.
    pub fn create(new: NewRequest, now: DateTime<Utc>) -> Result<Request> {
        let mut items = Vec::with_capacity(new.items.len());
        for item in new.items {
            upsert(&mut items, item);
        }

        let mut request = Request {
            id: new.id,
            title: new.title,
            description: new.description,
            items,
            reviewers: new.reviewers.into_iter().collect(),
            state: RequestState::Draft,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
            approved_at: None,
            closed_at: None,
        };

        if new.submit {
            request = request.submit(now)?;
        }
        debug!(request_id = %request.id, state = %request.state, "request created");
        Ok(request)
    }

    /// Request id
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// Title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Description
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Referenced item versions
    pub fn items(&self) -> &[RequestItem] {
        &self.items
    }

    /// Assigned reviewers
    pub fn reviewers(&self) -> &BTreeSet<UserId> {
        &self.reviewers
    }

    /// Current state
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Creator
    pub fn created_by(&self) -> &UserId {
        &self.created_by
    }

    /// Creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last change
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Approval time
    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    /// Closing time
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    /// Whether the request is in `DRAFT` or `WAITING`
    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// The entry for `item_id`, if the request references that item
    pub fn references(&self, item_id: &ItemId) -> Option<&RequestItem> {
        self.items.iter().find(|i| &i.item_id == item_id)
    }

    fn transition_check(&self, to: RequestState) -> Result<()> {
        if self.state.is_terminal() {
            return Err(Error::TerminalState {
                state: self.state.to_string(),
            });
        }
        let allowed = matches!(
            (self.state, to),
            (RequestState::Draft, RequestState::Waiting)
                | (RequestState::Waiting, RequestState::Approved)
                | (RequestState::Draft, RequestState::Closed)
                | (RequestState::Waiting, RequestState::Closed)
        );
        if allowed {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            })
        }
    }

    fn unlocked(&self) -> Result<()> {
        if self.state.is_terminal() {
            Err(Error::RequestLocked {
                state: self.state.to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn transitioned(&self, to: RequestState, now: DateTime<Utc>) -> Request {
        let mut next = self.clone();
        next.state = to;
        next.updated_at = now;
        debug!(request_id = %self.id, from = %self.state, to = %to, "request transitioned");
        next
    }

    /// `DRAFT → WAITING`; needs at least one reviewer and one item
    pub fn submit(&self, now: DateTime<Utc>) -> Result<Request> {
        self.transition_check(RequestState::Waiting)?;
        if self.reviewers.is_empty() {
            return Err(Error::NoReviewers);
        }
        if self.items.is_empty() {
            return Err(Error::EmptyRequest);
        }
        Ok(self.transitioned(RequestState::Waiting, now))
    }

    /// `WAITING → APPROVED`.
    ///
    /// This only changes the request. Use [`Request::approve_and_publish`] to
    /// move the `published` refs of the referenced items in the same step.
    pub fn approve(&self, now: DateTime<Utc>) -> Result<Request> {
        self.transition_check(RequestState::Approved)?;
        if self.items.is_empty() {
            return Err(Error::EmptyRequest);
        }
        let mut next = self.transitioned(RequestState::Approved, now);
        next.approved_at = Some(now);
        Ok(next)
    }

    /// `DRAFT | WAITING → CLOSED`; no ref changes
    pub fn close(&self, now: DateTime<Utc>) -> Result<Request> {
        self.transition_check(RequestState::Closed)?;
        let mut next = self.transitioned(RequestState::Closed, now);
        next.closed_at = Some(now);
        Ok(next)
    }

    /// Approve and publish every referenced version.
    ///
    /// `items` must contain every referenced item; items the request does
    /// not reference are ignored. Returns the approved request and the
    /// updated referenced items. Nothing is returned unless every item and
    /// version resolves.
    pub fn approve_and_publish(&self, items: &[Item], now: DateTime<Utc>) -> Result<(Request, Vec<Item>)> {
        let approved = self.approve(now)?;

        let mut published = Vec::with_capacity(self.items.len());
        for entry in &self.items {
            let item = items
                .iter()
                .find(|i| i.id() == &entry.item_id)
                .ok_or_else(|| Error::ItemNotFound {
                    id: entry.item_id.to_string(),
                })?;
            published.push(item.set_published(&entry.version)?);
        }

        debug!(request_id = %self.id, items = published.len(), "request approved and published");
        Ok((approved, published))
    }

    /// Add an item version, replacing any entry for the same item
    pub fn add_item(&self, item: RequestItem, now: DateTime<Utc>) -> Result<Request> {
        self.unlocked()?;
        let mut next = self.clone();
        upsert(&mut next.items, item);
        next.updated_at = now;
        Ok(next)
    }

    /// Remove the entry for `item_id`
    pub fn remove_item(&self, item_id: &ItemId, now: DateTime<Utc>) -> Result<Request> {
        self.unlocked()?;
        if self.references(item_id).is_none() {
            return Err(Error::ItemNotFound {
                id: item_id.to_string(),
            });
        }
        let mut next = self.clone();
        next.items.retain(|i| &i.item_id != item_id);
        next.updated_at = now;
        Ok(next)
    }

    /// Replace the reviewer set; a waiting request keeps at least one
    pub fn set_reviewers<I>(&self, reviewers: I, now: DateTime<Utc>) -> Result<Request>
    where
        I: IntoIterator<Item = UserId>,
    {
        self.unlocked()?;
        let reviewers: BTreeSet<UserId> = reviewers.into_iter().collect();
        if self.state == RequestState::Waiting && reviewers.is_empty() {
            return Err(Error::NoReviewers);
        }
        let mut next = self.clone();
        next.reviewers = reviewers;
        next.updated_at = now;
        Ok(next)
    }

    /// Change title and description
    pub fn update_details(
        &self,
        title: impl Into<String>,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Request> {
        self.unlocked()?;
        let mut next = self.clone();
        next.title = title.into();
        next.description = description;
        next.updated_at = now;
        Ok(next)
    }
}
