//! Lookup cache trait and error types.

use async_trait::async_trait;
use std::fmt;

/// Errors that can occur during cache operations.
#[derive(Debug)]
pub enum CacheError {
    ConnectionError(String),
    OperationError(String),
    InvalidEntry(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Cache connection error: {}", e),
            Self::OperationError(e) => write!(f, "Cache operation error: {}", e),
            Self::InvalidEntry(e) => write!(f, "Refusing to cache entry: {}", e),
        }
    }
}

impl std::error::Error for CacheError {}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Key under which a short code's long URL is cached.
///
/// Deterministic and collision-free: codes are base62, so they never
/// contain the `:` separator.
pub fn cache_key(short_code: &str) -> String {
    format!("urlshortener:url:id:{}", short_code)
}

/// Trait for the time-bounded cache fronting the store.
///
/// The cache is an optimization only; resolution stays correct without it.
/// Unlike a fail-open cache, transport errors PROPAGATE to the caller so a
/// broken cache surfaces as an internal failure instead of masking a real
/// record as absent.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache with TTL support
/// - [`crate::infrastructure::cache::MemoryCache`] - in-process cache for tests and development
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LookupCache: Send + Sync {
    /// Retrieves the long URL for a short code.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(url))` on cache hit
    /// - `Ok(None)` on cache miss
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] on transport failure.
    async fn get_url(&self, short_code: &str) -> CacheResult<Option<String>>;

    /// Stores a URL under the short code's key for `ttl_seconds`.
    ///
    /// A TTL of zero stores nothing, so the entry behaves as an immediate
    /// miss.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidEntry`] for an empty code or URL (a
    /// "not found" must never be cached as a value) and [`CacheError`] on
    /// transport failure.
    async fn set_url(&self, short_code: &str, long_url: &str, ttl_seconds: u64)
    -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    ///
    /// Used by health check endpoints to report cache status.
    async fn health_check(&self) -> bool;
}

/// Shared precondition check for [`LookupCache::set_url`] implementations.
///
/// `"0"` is the rendering of the zero identifier, which no real mapping
/// ever carries.
pub(super) fn validate_entry(short_code: &str, long_url: &str) -> CacheResult<()> {
    if short_code.is_empty() || short_code == "0" {
        return Err(CacheError::InvalidEntry(format!(
            "invalid short code {:?}",
            short_code
        )));
    }
    if long_url.is_empty() {
        return Err(CacheError::InvalidEntry("empty long URL".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_namespaced() {
        assert_eq!(cache_key("8M0kX"), "urlshortener:url:id:8M0kX");
    }

    #[test]
    fn test_validate_entry_rejects_empty_values() {
        assert!(validate_entry("", "https://example.com").is_err());
        assert!(validate_entry("8M0kX", "").is_err());
        assert!(validate_entry("8M0kX", "https://example.com").is_ok());
    }

    #[test]
    fn test_validate_entry_rejects_zero_identifier() {
        assert!(validate_entry("0", "https://example.com").is_err());
    }
}
