//! In-process implementation of the mapping repository.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::domain::entities::{Mapping, NewMapping};
use crate::domain::repositories::{InsertError, MappingRepository};
use crate::error::AppError;

/// Mapping store backed by a process-local map.
///
/// Enforces the same invariants as the PostgreSQL repository (unique
/// identifier, unique long URL, non-empty preconditions) so the pipelines
/// behave identically in integration tests and Postgres-free development.
#[derive(Default)]
pub struct MemoryMappingRepository {
    rows: Mutex<HashMap<u64, Mapping>>,
}

impl MemoryMappingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored mappings.
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MappingRepository for MemoryMappingRepository {
    async fn find_by_id(&self, id: u64) -> Result<Option<Mapping>, AppError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows.get(&id).cloned())
    }

    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<Mapping>, AppError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows.values().find(|m| m.long_url == long_url).cloned())
    }

    async fn insert(&self, new_mapping: NewMapping) -> Result<Mapping, InsertError> {
        if new_mapping.id == 0 {
            return Err(InsertError::Other(AppError::internal(
                "Mapping requires a non-zero identifier",
                json!({}),
            )));
        }
        if new_mapping.long_url.is_empty() {
            return Err(InsertError::Other(AppError::internal(
                "Mapping requires a long URL",
                json!({}),
            )));
        }

        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());

        if rows.contains_key(&new_mapping.id) {
            return Err(InsertError::DuplicateId);
        }
        if rows.values().any(|m| m.long_url == new_mapping.long_url) {
            return Err(InsertError::DuplicateLongUrl);
        }

        let mapping = Mapping::new(new_mapping.id, new_mapping.long_url, Utc::now());
        rows.insert(mapping.id, mapping.clone());
        Ok(mapping)
    }

    async fn health_check(&self) -> bool {
        true
    }
}
