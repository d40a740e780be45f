//! Short code resolution service.

use std::sync::Arc;

use serde_json::json;
use tracing::error;

use crate::application::coalescer::Coalescer;
use crate::domain::entities::Mapping;
use crate::domain::repositories::MappingRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheError, LookupCache};
use crate::infrastructure::gate::{ExistenceGate, GateError};
use crate::utils::base62;

/// Service resolving short codes to long URLs.
///
/// A lookup walks the layers from cheapest to most expensive: decode the
/// code, ask the existence gate, ask the cache, and only then read the
/// store, with concurrent misses for the same code merged into a single
/// store read whose result warms the cache.
///
/// The store is the source of truth; gate and cache only ever reject or
/// accelerate a lookup. Their failures surface as internal errors rather
/// than "not found", so a broken collaborator can never make an existing
/// mapping disappear.
pub struct ResolverService {
    repository: Arc<dyn MappingRepository>,
    cache: Arc<dyn LookupCache>,
    gate: Arc<dyn ExistenceGate>,
    flights: Coalescer<Option<Mapping>>,
    cache_ttl_seconds: u64,
}

impl ResolverService {
    /// Creates a new resolver service.
    pub fn new(
        repository: Arc<dyn MappingRepository>,
        cache: Arc<dyn LookupCache>,
        gate: Arc<dyn ExistenceGate>,
        cache_ttl_seconds: u64,
    ) -> Self {
        Self {
            repository,
            cache,
            gate,
            flights: Coalescer::new(),
            cache_ttl_seconds,
        }
    }

    /// Resolves a short code to its long URL.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] when the code is not base62
    /// - [`AppError::NotFound`] when the gate rules the code out or the
    ///   store has no row for it
    /// - [`AppError::Internal`] when gate, cache, or store fail
    pub async fn resolve(&self, short_code: &str) -> Result<String, AppError> {
        let id = base62::decode(short_code).map_err(|e| {
            AppError::bad_request(
                "Invalid short code",
                json!({ "code": short_code, "reason": e.to_string() }),
            )
        })?;

        if !self
            .gate
            .might_exist(short_code)
            .await
            .map_err(gate_failure)?
        {
            return Err(not_found(short_code));
        }

        if let Some(long_url) = self
            .cache
            .get_url(short_code)
            .await
            .map_err(cache_failure)?
        {
            return Ok(long_url);
        }

        let (found, _was_shared) = self
            .flights
            .run(short_code, Self::lookup_and_warm(
                self.repository.clone(),
                self.cache.clone(),
                short_code.to_string(),
                id,
                self.cache_ttl_seconds,
            ))
            .await;

        match found? {
            Some(mapping) => Ok(mapping.long_url),
            None => Err(not_found(short_code)),
        }
    }

    /// The coalesced part of a lookup: one store read, then a cache warm
    /// on behalf of every waiter.
    async fn lookup_and_warm(
        repository: Arc<dyn MappingRepository>,
        cache: Arc<dyn LookupCache>,
        short_code: String,
        id: u64,
        ttl_seconds: u64,
    ) -> Result<Option<Mapping>, AppError> {
        let found = repository.find_by_id(id).await?;

        if let Some(mapping) = &found {
            cache
                .set_url(&short_code, &mapping.long_url, ttl_seconds)
                .await
                .map_err(cache_failure)?;
        }

        Ok(found)
    }
}

fn not_found(short_code: &str) -> AppError {
    AppError::not_found("Short link not found", json!({ "code": short_code }))
}

fn gate_failure(e: GateError) -> AppError {
    error!("Existence gate failure: {e}");
    AppError::internal("Existence gate failure", json!({}))
}

fn cache_failure(e: CacheError) -> AppError {
    error!("Cache failure: {e}");
    AppError::internal("Cache failure", json!({}))
}
