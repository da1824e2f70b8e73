//! Workflow settings
//!
//! Settings are plain data handed to the operations that need them; nothing
//! in the crate reads configuration from global state.

use crate::error::Result;
use crate::fields::FieldTypeRegistry;
use crate::limits::Limits;
use serde::{Deserialize, Serialize};

/// Project-level settings for content processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Resource limits applied during coercion
    pub limits: Limits,

    /// When true, the published ref only moves through an approved request
    pub require_review: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            require_review: true,
        }
    }
}

impl Settings {
    /// Settings without a review gate: items may be published directly
    pub fn without_review() -> Self {
        Self {
            require_review: false,
            ..Self::default()
        }
    }

    /// Parse settings from a JSON document; missing keys take defaults
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Build settings from an already decoded JSON value
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Field type registry configured with these limits
    pub fn registry(&self) -> FieldTypeRegistry {
        FieldTypeRegistry::new(self.limits.clone())
    }
}
