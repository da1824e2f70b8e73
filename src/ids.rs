//! Identifier newtypes
//!
//! Ids are opaque strings assigned by the server. Wrapping them keeps a
//! field id from being passed where an item id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing id
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Mint a fresh random id
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Borrow the id as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

define_id!(
    /// Id of a field within a schema
    FieldId
);
define_id!(
    /// Id of a schema
    SchemaId
);
define_id!(
    /// Id of a model
    ModelId
);
define_id!(
    /// Id of a repeatable field group
    GroupId
);
define_id!(
    /// Id of an item
    ItemId
);
define_id!(
    /// Id of one instance of a repeatable group inside an item
    ItemGroupId
);
define_id!(
    /// Id of a review request
    RequestId
);
define_id!(
    /// Id of a user
    UserId
);
define_id!(
    /// Opaque version token of an item version
    Version
);
