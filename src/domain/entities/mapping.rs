//! Mapping entity representing a shortened URL.

use chrono::{DateTime, Utc};

use crate::utils::base62;

/// The mapping between an allocator identifier and a long URL.
///
/// A mapping is written once and never updated or deleted. The identifier
/// doubles as the public short code through its base62 rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub id: u64,
    pub long_url: String,
    pub created_at: DateTime<Utc>,
}

impl Mapping {
    /// Creates a new Mapping instance.
    pub fn new(id: u64, long_url: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            long_url,
            created_at,
        }
    }

    /// The public short code for this mapping.
    pub fn short_code(&self) -> String {
        base62::encode(self.id)
    }
}

/// Input data for persisting a new mapping.
#[derive(Debug, Clone)]
pub struct NewMapping {
    pub id: u64,
    pub long_url: String,
}

impl NewMapping {
    /// The short code the mapping will be published under.
    pub fn short_code(&self) -> String {
        base62::encode(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_creation() {
        let now = Utc::now();
        let mapping = Mapping::new(123_456_789, "https://example.com".to_string(), now);

        assert_eq!(mapping.id, 123_456_789);
        assert_eq!(mapping.long_url, "https://example.com");
        assert_eq!(mapping.created_at, now);
    }

    #[test]
    fn test_short_code_is_base62_of_id() {
        let mapping = Mapping::new(123_456_789, "https://example.com".to_string(), Utc::now());
        assert_eq!(mapping.short_code(), "8M0kX");
    }

    #[test]
    fn test_new_mapping_short_code_matches_entity() {
        let new_mapping = NewMapping {
            id: 62,
            long_url: "https://rust-lang.org".to_string(),
        };
        assert_eq!(new_mapping.short_code(), "10");
    }
}
