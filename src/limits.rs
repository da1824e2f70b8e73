//! Limits and constraints for content value processing
//!
//! This module defines bounds on the size of field values so that raw
//! payloads coming from the transport layer cannot exhaust resources
//! (huge strings, unbounded arrays, geometry with millions of positions).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Global limits configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Limits {
    /// Maximum length of a text value in characters
    pub max_text_length: usize,

    /// Maximum number of elements in a multi-valued field
    pub max_multiple_values: usize,

    /// Maximum number of positions in a single geometry
    pub max_geometry_positions: usize,

    /// Maximum number of members in a GeometryCollection
    pub max_collection_geometries: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_text_length: 1024 * 1024,
            max_multiple_values: 1000,
            max_geometry_positions: 100_000,
            max_collection_geometries: 1000,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_text_length: 64 * 1024,
            max_multiple_values: 100,
            max_geometry_positions: 10_000,
            max_collection_geometries: 100,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_text_length: 64 * 1024 * 1024,
            max_multiple_values: 100_000,
            max_geometry_positions: 10_000_000,
            max_collection_geometries: 100_000,
        }
    }

    /// Check if a text value length is within limits
    pub fn check_text_length(&self, len: usize) -> Result<()> {
        if len > self.max_text_length {
            Err(Error::LimitExceeded(format!(
                "Text length {} exceeds maximum {}",
                len, self.max_text_length
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the number of values in a multi-valued field is within limits
    pub fn check_multiple_values(&self, count: usize) -> Result<()> {
        if count > self.max_multiple_values {
            Err(Error::LimitExceeded(format!(
                "Value count {} exceeds maximum {}",
                count, self.max_multiple_values
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the number of geometry positions is within limits
    pub fn check_geometry_positions(&self, count: usize) -> Result<()> {
        if count > self.max_geometry_positions {
            Err(Error::LimitExceeded(format!(
                "Geometry position count {} exceeds maximum {}",
                count, self.max_geometry_positions
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the number of collection members is within limits
    pub fn check_collection_geometries(&self, count: usize) -> Result<()> {
        if count > self.max_collection_geometries {
            Err(Error::LimitExceeded(format!(
                "GeometryCollection member count {} exceeds maximum {}",
                count, self.max_collection_geometries
            )))
        } else {
            Ok(())
        }
    }
}
