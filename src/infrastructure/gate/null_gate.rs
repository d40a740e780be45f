//! Pass-through gate for disabled filtering.

use super::service::{ExistenceGate, GateResult};
use async_trait::async_trait;
use tracing::debug;

/// A gate that lets every lookup through.
///
/// Used when the bloom-filter backend is unavailable. Reporting every code
/// as possibly existing keeps the no-false-negative contract; lookups just
/// lose the cheap-rejection fast path and fall through to cache and store.
pub struct NullGate;

impl NullGate {
    /// Creates a new NullGate instance.
    pub fn new() -> Self {
        debug!("Using NullGate (existence filtering disabled)");
        Self
    }
}

impl Default for NullGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExistenceGate for NullGate {
    async fn reserve(&self, _capacity: u64, _error_rate: f64) -> GateResult<()> {
        Ok(())
    }

    async fn add(&self, _short_code: &str) -> GateResult<()> {
        Ok(())
    }

    async fn might_exist(&self, _short_code: &str) -> GateResult<bool> {
        Ok(true)
    }

    async fn health_check(&self) -> bool {
        true
    }
}
