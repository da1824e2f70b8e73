//! Field key grammar and key derivation
//!
//! Keys are human-readable slugs: lowercase ASCII letters, digits and
//! hyphens, starting with a letter or digit. Keys are compared
//! case-insensitively for uniqueness.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").unwrap());

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static HYPHEN_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());

/// Maximum length of a field key
pub const MAX_KEY_LENGTH: usize = 32;

/// Keys the transport layer reserves for its own attributes
pub const RESERVED_KEYS: &[&str] = &["id"];

/// Check if a string is a valid field key
pub fn is_valid_key(key: &str) -> bool {
    key.len() <= MAX_KEY_LENGTH && KEY.is_match(key) && !is_reserved(key)
}

fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(key))
}

/// Validate a field key and return an error if invalid
pub fn validate_key(key: &str) -> Result<()> {
    let reason = if key.is_empty() {
        "key must not be empty".to_string()
    } else if key.len() > MAX_KEY_LENGTH {
        format!("key must be at most {} characters", MAX_KEY_LENGTH)
    } else if !KEY.is_match(key) {
        "key may only contain lowercase letters, digits and hyphens".to_string()
    } else if is_reserved(key) {
        "key is reserved".to_string()
    } else {
        return Ok(());
    };

    Err(Error::InvalidKey {
        key: key.to_string(),
        reason,
    })
}

/// Derive a key from a field title.
///
/// The title is lowercased, whitespace runs become single hyphens and any
/// character outside the key grammar is dropped. Returns `None` when nothing
/// usable is left.
pub fn derive_key(title: &str) -> Option<String> {
    let lowered = title.trim().to_lowercase();
    let hyphenated = WHITESPACE_RUN.replace_all(&lowered, "-");
    let filtered: String = hyphenated
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();
    let collapsed = HYPHEN_RUN.replace_all(&filtered, "-");
    let mut key = collapsed.trim_matches('-').to_string();

    if key.len() > MAX_KEY_LENGTH {
        key.truncate(MAX_KEY_LENGTH);
        key = key.trim_end_matches('-').to_string();
    }

    if is_valid_key(&key) {
        Some(key)
    } else {
        None
    }
}

/// Case-insensitive key equality
pub fn keys_equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("title"));
        assert!(is_valid_key("main-image"));
        assert!(is_valid_key("2024-report"));

        assert!(!is_valid_key(""));
        assert!(!is_valid_key("Title"));
        assert!(!is_valid_key("-title"));
        assert!(!is_valid_key("my_title"));
        assert!(!is_valid_key("id"));
        assert!(!is_valid_key(&"a".repeat(MAX_KEY_LENGTH + 1)));
    }

    #[test]
    fn test_validate_key_reason() {
        match validate_key("Bad Key") {
            Err(Error::InvalidKey { key, reason }) => {
                assert_eq!(key, "Bad Key");
                assert!(reason.contains("lowercase"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(validate_key("good-key").is_ok());
    }

    #[test]
    fn test_derive_key() {
        assert_eq!(derive_key("Title").as_deref(), Some("title"));
        assert_eq!(derive_key("Main  Image").as_deref(), Some("main-image"));
        assert_eq!(derive_key(" Price (EUR) ").as_deref(), Some("price-eur"));
        assert_eq!(derive_key("a - b").as_deref(), Some("a-b"));
        assert_eq!(derive_key("!!!"), None);
        assert_eq!(derive_key("ID"), None);
    }

    #[test]
    fn test_derive_key_truncates() {
        let key = derive_key("a very long title that keeps going and going").unwrap();
        assert!(key.len() <= MAX_KEY_LENGTH);
        assert!(!key.ends_with('-'));
    }

    #[test]
    fn test_keys_equal() {
        assert!(keys_equal("Title", "title"));
        assert!(!keys_equal("title", "titles"));
    }
}
