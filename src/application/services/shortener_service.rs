//! Short link creation service.

use std::sync::Arc;

use serde_json::json;
use tracing::{error, warn};
use url::Url;

use crate::domain::allocator::IdAllocator;
use crate::domain::entities::{Mapping, NewMapping};
use crate::domain::repositories::{InsertError, MappingRepository};
use crate::error::AppError;
use crate::infrastructure::cache::LookupCache;
use crate::infrastructure::gate::ExistenceGate;

/// Service creating mappings for long URLs.
///
/// Creation is idempotent per long URL: a URL that was already shortened
/// yields its existing mapping. New URLs get a freshly allocated
/// identifier, are persisted, registered with the existence gate, and
/// warmed into the cache. The store's uniqueness constraint on the long
/// URL backstops the dedup check, so two concurrent creations of the same
/// URL converge on a single mapping.
pub struct ShortenerService {
    repository: Arc<dyn MappingRepository>,
    cache: Arc<dyn LookupCache>,
    gate: Arc<dyn ExistenceGate>,
    allocator: Arc<IdAllocator>,
    cache_ttl_seconds: u64,
}

impl ShortenerService {
    /// Creates a new shortener service.
    pub fn new(
        repository: Arc<dyn MappingRepository>,
        cache: Arc<dyn LookupCache>,
        gate: Arc<dyn ExistenceGate>,
        allocator: Arc<IdAllocator>,
        cache_ttl_seconds: u64,
    ) -> Self {
        Self {
            repository,
            cache,
            gate,
            allocator,
            cache_ttl_seconds,
        }
    }

    /// Shortens a long URL, returning its mapping.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] for an empty or malformed URL
    /// - [`AppError::Conflict`] if the freshly allocated identifier
    ///   already exists in the store (an allocator invariant violation;
    ///   never retried blindly)
    /// - [`AppError::Internal`] when allocation or a collaborator fails.
    ///   The mapping may already be durable at that point; retrying the
    ///   same URL returns it instead of creating a second one.
    pub async fn shorten(&self, long_url: &str) -> Result<Mapping, AppError> {
        validate_long_url(long_url)?;

        if let Some(existing) = self.repository.find_by_long_url(long_url).await? {
            self.warm_cache(&existing).await?;
            return Ok(existing);
        }

        let id = self.allocator.allocate().map_err(|e| {
            error!("Identifier allocation failed: {e}");
            AppError::internal("Identifier allocation failed", json!({}))
        })?;

        let new_mapping = NewMapping {
            id,
            long_url: long_url.to_string(),
        };

        let mapping = match self.repository.insert(new_mapping).await {
            Ok(mapping) => mapping,
            Err(InsertError::DuplicateLongUrl) => {
                // Another request created this URL between the dedup check
                // and the insert; adopt its mapping.
                warn!("Lost creation race for {long_url}, returning existing mapping");
                let existing = self
                    .repository
                    .find_by_long_url(long_url)
                    .await?
                    .ok_or_else(|| {
                        AppError::internal(
                            "Mapping vanished after duplicate long URL conflict",
                            json!({}),
                        )
                    })?;
                self.warm_cache(&existing).await?;
                return Ok(existing);
            }
            Err(InsertError::DuplicateId) => {
                error!("Allocated identifier {id} already exists");
                return Err(AppError::conflict(
                    "Identifier already exists",
                    json!({ "id": id }),
                ));
            }
            Err(InsertError::Other(e)) => return Err(e),
        };

        // The mapping must be registered with the gate before it is
        // resolvable, or gated lookups would reject it as absent.
        self.gate.add(&mapping.short_code()).await.map_err(|e| {
            error!("Existence gate add failed: {e}");
            AppError::internal("Existence gate failure", json!({}))
        })?;

        self.warm_cache(&mapping).await?;

        Ok(mapping)
    }

    async fn warm_cache(&self, mapping: &Mapping) -> Result<(), AppError> {
        self.cache
            .set_url(
                &mapping.short_code(),
                &mapping.long_url,
                self.cache_ttl_seconds,
            )
            .await
            .map_err(|e| {
                error!("Cache warm failed: {e}");
                AppError::internal("Cache failure", json!({}))
            })
    }
}

/// Checks that the input is a well-formed absolute HTTP(S) URL.
///
/// Restricting the scheme keeps the redirect endpoint from ever emitting a
/// `Location` like `javascript:` or `data:`.
fn validate_long_url(long_url: &str) -> Result<(), AppError> {
    if long_url.is_empty() {
        return Err(AppError::bad_request("long_url is required", json!({})));
    }

    let parsed = Url::parse(long_url).map_err(|e| {
        AppError::bad_request(
            "Invalid URL format",
            json!({ "long_url": long_url, "reason": e.to_string() }),
        )
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::bad_request(
            "Only HTTP and HTTPS URLs can be shortened",
            json!({ "scheme": other }),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockMappingRepository;
    use crate::infrastructure::cache::MockLookupCache;
    use crate::infrastructure::gate::MockExistenceGate;
    use crate::utils::base62;
    use chrono::Utc;
    use mockall::Sequence;

    const TTL: u64 = 3600;

    fn allocator() -> Arc<IdAllocator> {
        Arc::new(IdAllocator::new(1, "2020-01-01").unwrap())
    }

    fn service(
        repository: MockMappingRepository,
        cache: MockLookupCache,
        gate: MockExistenceGate,
    ) -> ShortenerService {
        ShortenerService::new(
            Arc::new(repository),
            Arc::new(cache),
            Arc::new(gate),
            allocator(),
            TTL,
        )
    }

    fn mapping(id: u64, url: &str) -> Mapping {
        Mapping::new(id, url.to_string(), Utc::now())
    }

    #[tokio::test]
    async fn test_rejects_invalid_urls_before_any_store_call() {
        // No expectations: any repository, cache, or gate call panics.
        let service = service(
            MockMappingRepository::new(),
            MockLookupCache::new(),
            MockExistenceGate::new(),
        );

        for input in ["", "not-a-url", "example.com/no-scheme", "ftp://example.com/f"] {
            let err = service.shorten(input).await.unwrap_err();
            assert!(
                matches!(err, AppError::Validation { .. }),
                "expected validation error for {input:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_existing_url_short_circuits_and_warms_cache() {
        let existing = mapping(123_456_789, "https://example.com/a");

        let mut repository = MockMappingRepository::new();
        let found = existing.clone();
        repository
            .expect_find_by_long_url()
            .withf(|url| url == "https://example.com/a")
            .times(1)
            .returning(move |_| Ok(Some(found.clone())));
        repository.expect_insert().times(0);

        let mut cache = MockLookupCache::new();
        cache
            .expect_set_url()
            .withf(|code, url, ttl| {
                code == "8M0kX" && url == "https://example.com/a" && *ttl == TTL
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut gate = MockExistenceGate::new();
        gate.expect_add().times(0);

        let service = service(repository, cache, gate);

        let result = service.shorten("https://example.com/a").await.unwrap();
        assert_eq!(result.id, existing.id);
        assert_eq!(result.short_code(), "8M0kX");
    }

    #[tokio::test]
    async fn test_new_url_is_persisted_gated_and_cached() {
        let mut repository = MockMappingRepository::new();
        repository
            .expect_find_by_long_url()
            .times(1)
            .returning(|_| Ok(None));
        repository
            .expect_insert()
            .withf(|nm| nm.id != 0 && nm.long_url == "https://example.com/new")
            .times(1)
            .returning(|nm| Ok(Mapping::new(nm.id, nm.long_url, Utc::now())));

        let mut gate = MockExistenceGate::new();
        gate.expect_add()
            .withf(|code| base62::decode(code).is_ok())
            .times(1)
            .returning(|_| Ok(()));

        let mut cache = MockLookupCache::new();
        cache
            .expect_set_url()
            .withf(|_, url, _| url == "https://example.com/new")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = service(repository, cache, gate);

        let result = service.shorten("https://example.com/new").await.unwrap();
        assert_eq!(result.long_url, "https://example.com/new");
        assert_eq!(result.short_code(), base62::encode(result.id));
    }

    #[tokio::test]
    async fn test_lost_creation_race_adopts_winner() {
        let winner = mapping(42, "https://example.com/raced");

        let mut seq = Sequence::new();
        let mut repository = MockMappingRepository::new();
        repository
            .expect_find_by_long_url()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        repository
            .expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(InsertError::DuplicateLongUrl));
        let adopted = winner.clone();
        repository
            .expect_find_by_long_url()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(adopted.clone())));

        let mut cache = MockLookupCache::new();
        cache
            .expect_set_url()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut gate = MockExistenceGate::new();
        gate.expect_add().times(0);

        let service = service(repository, cache, gate);

        let result = service.shorten("https://example.com/raced").await.unwrap();
        assert_eq!(result.id, 42);
    }

    #[tokio::test]
    async fn test_duplicate_identifier_is_a_conflict() {
        let mut repository = MockMappingRepository::new();
        repository
            .expect_find_by_long_url()
            .times(1)
            .returning(|_| Ok(None));
        repository
            .expect_insert()
            .times(1)
            .returning(|_| Err(InsertError::DuplicateId));

        let service = service(
            repository,
            MockLookupCache::new(),
            MockExistenceGate::new(),
        );

        let err = service.shorten("https://example.com/dup").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_gate_add_failure_surfaces_as_internal() {
        let mut repository = MockMappingRepository::new();
        repository
            .expect_find_by_long_url()
            .times(1)
            .returning(|_| Ok(None));
        repository
            .expect_insert()
            .times(1)
            .returning(|nm| Ok(Mapping::new(nm.id, nm.long_url, Utc::now())));

        let mut gate = MockExistenceGate::new();
        gate.expect_add()
            .times(1)
            .returning(|_| Err(crate::infrastructure::gate::GateError::OperationError(
                "gate down".to_string(),
            )));

        let service = service(repository, MockLookupCache::new(), gate);

        let err = service.shorten("https://example.com/g").await.unwrap_err();
        assert!(matches!(err, AppError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_cache_warm_failure_surfaces_even_after_persist() {
        let mut repository = MockMappingRepository::new();
        repository
            .expect_find_by_long_url()
            .times(1)
            .returning(|_| Ok(None));
        repository
            .expect_insert()
            .times(1)
            .returning(|nm| Ok(Mapping::new(nm.id, nm.long_url, Utc::now())));

        let mut gate = MockExistenceGate::new();
        gate.expect_add().times(1).returning(|_| Ok(()));

        let mut cache = MockLookupCache::new();
        cache.expect_set_url().times(1).returning(|_, _, _| {
            Err(crate::infrastructure::cache::CacheError::OperationError(
                "cache down".to_string(),
            ))
        });

        let service = service(repository, cache, gate);

        let err = service.shorten("https://example.com/c").await.unwrap_err();
        assert!(matches!(err, AppError::Internal { .. }));
    }
}
