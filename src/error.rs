//! Error types for cms-content
//!
//! This module defines all error types used throughout the library.
//! Expected domain violations are returned as values; only programmer
//! contract violations (such as an out-of-range index handed to the
//! multi-value orderer) panic.

use std::fmt;
use thiserror::Error;

/// Result type alias using the cms-content Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for cms-content operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A coerced value violates a field's type constraints
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A geometry or structural payload does not match the expected shape
    #[error("schema violation: {0}")]
    Schema(#[from] SchemaViolation),

    /// Another field in the schema already uses this key
    #[error("duplicate key: '{key}'")]
    DuplicateKey {
        /// The conflicting key
        key: String,
    },

    /// The key does not match the key grammar
    #[error("invalid key '{key}': {reason}")]
    InvalidKey {
        /// The rejected key
        key: String,
        /// Why the key was rejected
        reason: String,
    },

    /// A reorder call did not supply a permutation of the field ids
    #[error("order mismatch: {0}")]
    OrderMismatch(String),

    /// No field with this id exists in the schema
    #[error("field not found: {id}")]
    FieldNotFound {
        /// The missing field id
        id: String,
    },

    /// A field type carries inconsistent constraints
    #[error("invalid constraint: {0}")]
    InvalidConstraint(String),

    /// The field type cannot be used in this kind of schema
    #[error("field type '{kind}' is not allowed in a {schema_kind} schema")]
    FieldKindNotAllowed {
        /// The rejected field type
        kind: String,
        /// The kind of schema
        schema_kind: String,
    },

    /// A field operation was given a schema that does not own the item's values
    #[error("schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch {
        /// What the operation required
        expected: String,
        /// What was supplied
        found: String,
    },

    /// Attempted transition out of an approved or closed request
    #[error("request is in terminal state {state}")]
    TerminalState {
        /// The terminal state the request is in
        state: String,
    },

    /// Attempted to change the items of an approved or closed request
    #[error("request is locked in state {state}")]
    RequestLocked {
        /// The terminal state the request is in
        state: String,
    },

    /// Transition not defined for the current state
    #[error("cannot transition request from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },

    /// Submitting a request for review needs at least one reviewer
    #[error("request has no reviewers")]
    NoReviewers,

    /// Submitting or approving a request needs at least one item
    #[error("request has no items")]
    EmptyRequest,

    /// No item with this id was supplied
    #[error("item not found: {id}")]
    ItemNotFound {
        /// The missing item id
        id: String,
    },

    /// The item has no version with this token
    #[error("version {version} not found on item {item}")]
    VersionNotFound {
        /// The item id
        item: String,
        /// The missing version token
        version: String,
    },

    /// Direct publish attempted while a review gate is configured
    #[error("publishing item {item} requires an approved request")]
    ReviewRequired {
        /// The item id
        item: String,
    },

    /// Write into a version that is published or under review
    #[error("version {version} of item {item} is sealed; create a new version to edit")]
    VersionSealed {
        /// The item id
        item: String,
        /// The sealed version
        version: String,
    },

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// JSON decoding error (settings, raw payloads).
    ///
    /// Holds the rendered message because `serde_json::Error` is neither
    /// `Clone` nor `PartialEq`; converted through `From` so `?` still works.
    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

/// Field value validation error with context
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error message
    pub message: String,
    /// Id of the field whose value failed
    pub field_id: Option<String>,
    /// Key of the field whose value failed
    pub key: Option<String>,
    /// Position of the failing element in a multi-valued input
    pub index: Option<usize>,
    /// Underlying reason
    pub reason: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field_id: None,
            key: None,
            index: None,
            reason: None,
        }
    }

    /// Set the field id
    pub fn with_field(mut self, field_id: impl Into<String>) -> Self {
        self.field_id = Some(field_id.into());
        self
    }

    /// Set the field key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the element index
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref key) = self.key {
            write!(f, " (field '{}')", key)?;
        } else if let Some(ref id) = self.field_id {
            write!(f, " (field id {})", id)?;
        }

        if let Some(index) = self.index {
            write!(f, " at index {}", index)?;
        }

        if let Some(ref reason) = self.reason {
            write!(f, ": {}", reason)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Structural mismatch inside a nested payload
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaViolation {
    /// JSON pointer to the offending node (empty for the root)
    pub path: String,
    /// What was expected at that node
    pub expected_type: String,
    /// Additional detail
    pub message: Option<String>,
}

impl SchemaViolation {
    /// Create a new schema violation
    pub fn new(path: impl Into<String>, expected_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            expected_type: expected_type.into(),
            message: None,
        }
    }

    /// Set the detail message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "expected {} at {}", self.expected_type, path)?;

        if let Some(ref message) = self.message {
            write!(f, " ({})", message)?;
        }

        Ok(())
    }
}

impl std::error::Error for SchemaViolation {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("value is out of range")
            .with_key("price")
            .with_index(2)
            .with_reason("maximum is 10");

        let msg = format!("{}", err);
        assert!(msg.contains("value is out of range"));
        assert!(msg.contains("'price'"));
        assert!(msg.contains("index 2"));
        assert!(msg.contains("maximum is 10"));
    }

    #[test]
    fn test_schema_violation_display() {
        let err = SchemaViolation::new("/coordinates/0", "number")
            .with_message("found string");

        let msg = format!("{}", err);
        assert!(msg.contains("expected number at /coordinates/0"));
        assert!(msg.contains("found string"));

        let root = SchemaViolation::new("", "object");
        assert_eq!(root.to_string(), "expected object at /");
    }

    #[test]
    fn test_error_conversion() {
        let val_err = ValidationError::new("test");
        let err: Error = val_err.into();
        assert!(matches!(err, Error::Validation(_)));

        let violation = SchemaViolation::new("/type", "geometry type");
        let err: Error = violation.into();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
        assert_eq!(err.clone(), err);
        assert!(err.to_string().starts_with("JSON error: EOF"));
    }

    #[test]
    fn test_json_error_propagates_with_question_mark() {
        fn decode(raw: &str) -> Result<serde_json::Value> {
            Ok(serde_json::from_str(raw)?)
        }
        assert!(decode("[1]").is_ok());
        assert!(matches!(decode("[1,"), Err(Error::Json(_))));
    }
}
