//! Existence gate trait and error types.

use async_trait::async_trait;
use std::fmt;

/// Errors that can occur during gate operations.
#[derive(Debug)]
pub enum GateError {
    ConnectionError(String),
    OperationError(String),
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Gate connection error: {}", e),
            Self::OperationError(e) => write!(f, "Gate operation error: {}", e),
        }
    }
}

impl std::error::Error for GateError {}

/// Result type for gate operations.
pub type GateResult<T> = Result<T, GateError>;

/// Name of the probabilistic-set resource holding every short code ever
/// minted.
pub const GATE_KEY: &str = "urlshortener:gate:base62id";

/// Trait for the probabilistic membership filter ahead of cache and store.
///
/// A code that was [`add`](ExistenceGate::add)ed is always reported as
/// possibly existing (no false negatives); a code never added may still be
/// reported as existing at a bounded rate configured through
/// [`reserve`](ExistenceGate::reserve). Lookups for codes the gate rules
/// out never reach the cache or store.
///
/// # Implementations
///
/// - [`crate::infrastructure::gate::RedisGate`] - RedisBloom-backed filter
/// - [`crate::infrastructure::gate::MemoryGate`] - exact in-process membership for tests
/// - [`crate::infrastructure::gate::NullGate`] - pass-through when the gate is disabled
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExistenceGate: Send + Sync {
    /// Initializes the filter for `capacity` items at `error_rate`.
    ///
    /// Must be called once before first use. Reserving an
    /// already-reserved filter is a no-op, not an error, so every process
    /// can call this unconditionally at startup.
    async fn reserve(&self, capacity: u64, error_rate: f64) -> GateResult<()>;

    /// Records a short code as existing.
    ///
    /// Called for every successfully created mapping before it becomes
    /// resolvable.
    async fn add(&self, short_code: &str) -> GateResult<()>;

    /// Tests whether a short code may exist.
    ///
    /// `false` is definitive; `true` may be a false positive.
    async fn might_exist(&self, short_code: &str) -> GateResult<bool>;

    /// Checks if the gate backend is healthy.
    async fn health_check(&self) -> bool;
}
