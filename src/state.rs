//! Shared application state injected into HTTP handlers.

use std::sync::Arc;

use crate::application::services::{ResolverService, ShortenerService};
use crate::domain::repositories::MappingRepository;
use crate::infrastructure::cache::LookupCache;
use crate::infrastructure::gate::ExistenceGate;

/// State shared by all request handlers.
///
/// Services own their collaborators; the raw repository, cache, and gate
/// handles are kept alongside them for the health endpoint.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ResolverService>,
    pub shortener: Arc<ShortenerService>,
    pub repository: Arc<dyn MappingRepository>,
    pub cache: Arc<dyn LookupCache>,
    pub gate: Arc<dyn ExistenceGate>,
    pub short_url_prefix: String,
}

impl AppState {
    /// Creates the application state.
    pub fn new(
        resolver: Arc<ResolverService>,
        shortener: Arc<ShortenerService>,
        repository: Arc<dyn MappingRepository>,
        cache: Arc<dyn LookupCache>,
        gate: Arc<dyn ExistenceGate>,
        short_url_prefix: String,
    ) -> Self {
        Self {
            resolver,
            shortener,
            repository,
            cache,
            gate,
            short_url_prefix,
        }
    }

    /// The full public short URL for a code.
    pub fn short_url(&self, code: &str) -> String {
        format!(
            "{}/api/v1/shortUrl/{}",
            self.short_url_prefix.trim_end_matches('/'),
            code
        )
    }
}
