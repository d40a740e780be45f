//! In-process cache implementation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::service::{CacheResult, LookupCache, cache_key, validate_entry};
use async_trait::async_trait;

struct Entry {
    long_url: String,
    expires_at: Instant,
}

/// A cache backed by a process-local map with per-entry expiry.
///
/// Useful for integration tests and single-instance deployments without
/// Redis. Expired entries are dropped lazily on read.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.values().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LookupCache for MemoryCache {
    async fn get_url(&self, short_code: &str) -> CacheResult<Option<String>> {
        let key = cache_key(short_code);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        match entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.long_url.clone())),
            Some(_) => {
                entries.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_url(
        &self,
        short_code: &str,
        long_url: &str,
        ttl_seconds: u64,
    ) -> CacheResult<()> {
        validate_entry(short_code, long_url)?;

        if ttl_seconds == 0 {
            return Ok(());
        }

        let key = cache_key(short_code);
        let entry = Entry {
            long_url: long_url.to_string(),
            expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
        };

        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, entry);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
