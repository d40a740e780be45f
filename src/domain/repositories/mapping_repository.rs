//! Repository trait for mapping data access.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{Mapping, NewMapping};
use crate::error::AppError;

/// Errors from [`MappingRepository::insert`].
///
/// Duplicate-key outcomes are separated from transport failures because the
/// creation flow reacts to them differently: a duplicate identifier is an
/// allocator invariant violation and fatal to the attempt, while a duplicate
/// long URL means another request won the creation race and its mapping
/// should be returned instead.
#[derive(Debug, Error)]
pub enum InsertError {
    #[error("identifier already exists")]
    DuplicateId,

    #[error("long URL already exists")]
    DuplicateLongUrl,

    #[error(transparent)]
    Other(#[from] AppError),
}

/// Repository interface for the system of record.
///
/// Lookups are single-row point reads; there is no update or delete path.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgMappingRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryMappingRepository`] - in-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MappingRepository: Send + Sync {
    /// Finds a mapping by its identifier.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Mapping))` if found
    /// - `Ok(None)` if no row exists for the identifier
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_id(&self, id: u64) -> Result<Option<Mapping>, AppError>;

    /// Finds a mapping by its long URL.
    ///
    /// Used to keep creation idempotent per long URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<Mapping>, AppError>;

    /// Persists a new mapping.
    ///
    /// Rejects a zero identifier or empty long URL as precondition
    /// violations before touching the store.
    ///
    /// # Errors
    ///
    /// - [`InsertError::DuplicateId`] if the identifier already exists
    /// - [`InsertError::DuplicateLongUrl`] if the long URL already exists
    /// - [`InsertError::Other`] for anything else
    async fn insert(&self, new_mapping: NewMapping) -> Result<Mapping, InsertError>;

    /// Checks whether the backing store is reachable.
    ///
    /// Used by the health endpoint.
    async fn health_check(&self) -> bool;
}
