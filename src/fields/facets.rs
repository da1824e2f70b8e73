//! Constraining facets for field values
//!
//! Facets check one constraint each. They report a bare [`ValidationError`];
//! the registry attaches the field context before handing it to callers.

use crate::error::ValidationError;
use indexmap::IndexSet;
use std::fmt;

/// Result of checking a single facet
pub type FacetResult = std::result::Result<(), ValidationError>;

/// Maximum length facet, counted in characters
#[derive(Debug, Clone, Copy)]
pub struct MaxLengthFacet {
    /// Maximum length
    pub value: usize,
}

impl MaxLengthFacet {
    /// Create a new maximum length facet
    pub fn new(value: usize) -> Self {
        Self { value }
    }

    /// Validate a value against this facet
    pub fn validate(&self, value: &str) -> FacetResult {
        let len = value.chars().count();
        if len > self.value {
            Err(ValidationError::new(format!("Length must be at most {}", self.value))
                .with_reason(format!("Actual length: {}", len)))
        } else {
            Ok(())
        }
    }
}

/// Inclusive range facet; either bound may be absent
#[derive(Debug, Clone, Copy)]
pub struct RangeFacet<T> {
    /// Lower bound (inclusive)
    pub min: Option<T>,
    /// Upper bound (inclusive)
    pub max: Option<T>,
}

impl<T> RangeFacet<T>
where
    T: PartialOrd + Copy + fmt::Display,
{
    /// Create a new range facet
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    /// Whether the bounds are consistent
    pub fn is_consistent(&self) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        }
    }

    /// Validate a value against this facet
    pub fn validate(&self, value: T) -> FacetResult {
        if let Some(min) = self.min {
            if value < min {
                return Err(ValidationError::new(format!("Value must be >= {}", min))
                    .with_reason(format!("Value: {}", value)));
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return Err(ValidationError::new(format!("Value must be <= {}", max))
                    .with_reason(format!("Value: {}", value)));
            }
        }
        Ok(())
    }
}

/// Set-membership facet for select and tag values
#[derive(Debug, Clone, Copy)]
pub struct EnumerationFacet<'a> {
    /// Allowed values
    pub values: &'a IndexSet<String>,
}

impl<'a> EnumerationFacet<'a> {
    /// Create a new enumeration facet
    pub fn new(values: &'a IndexSet<String>) -> Self {
        Self { values }
    }

    /// Validate a value against this enumeration
    pub fn validate(&self, value: &str) -> FacetResult {
        if self.values.contains(value) {
            Ok(())
        } else {
            let allowed: Vec<&str> = self.values.iter().map(String::as_str).collect();
            Err(ValidationError::new(format!("Value '{}' is not one of the allowed values", value))
                .with_reason(format!("Allowed values: {:?}", allowed)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_length_counts_chars() {
        let facet = MaxLengthFacet::new(3);
        assert!(facet.validate("abc").is_ok());
        assert!(facet.validate("äöü").is_ok());
        assert!(facet.validate("abcd").is_err());
    }

    #[test]
    fn test_range_facet_bounds() {
        let facet = RangeFacet::new(Some(0i64), Some(10));
        assert!(facet.validate(0).is_ok());
        assert!(facet.validate(10).is_ok());
        assert!(facet.validate(-1).is_err());
        assert!(facet.validate(11).is_err());
    }

    #[test]
    fn test_range_facet_open_ends() {
        let lower_only = RangeFacet::new(Some(1.5f64), None);
        assert!(lower_only.validate(1e9).is_ok());
        assert!(lower_only.validate(1.0).is_err());

        let unbounded: RangeFacet<i64> = RangeFacet::new(None, None);
        assert!(unbounded.validate(i64::MIN).is_ok());
    }

    #[test]
    fn test_range_facet_consistency() {
        assert!(RangeFacet::new(Some(1i64), Some(1)).is_consistent());
        assert!(!RangeFacet::new(Some(2i64), Some(1)).is_consistent());
        assert!(RangeFacet::new(None, Some(1i64)).is_consistent());
    }

    #[test]
    fn test_enumeration_facet() {
        let values: IndexSet<String> = ["red", "green"].iter().map(|s| s.to_string()).collect();
        let facet = EnumerationFacet::new(&values);
        assert!(facet.validate("red").is_ok());
        let err = facet.validate("blue").unwrap_err();
        assert!(err.message.contains("blue"));
        assert!(err.reason.unwrap().contains("green"));
    }
}
