//! In-process existence gate.

use std::collections::HashSet;
use std::sync::RwLock;

use super::service::{ExistenceGate, GateResult};
use async_trait::async_trait;

/// Gate backed by an exact in-process membership set.
///
/// Behaves like a bloom filter with a zero false-positive rate. Intended
/// for integration tests and Redis-free development; it does not share
/// state across instances and forgets everything on restart.
#[derive(Default)]
pub struct MemoryGate {
    codes: RwLock<HashSet<String>>,
}

impl MemoryGate {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExistenceGate for MemoryGate {
    async fn reserve(&self, _capacity: u64, _error_rate: f64) -> GateResult<()> {
        Ok(())
    }

    async fn add(&self, short_code: &str) -> GateResult<()> {
        self.codes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(short_code.to_string());
        Ok(())
    }

    async fn might_exist(&self, short_code: &str) -> GateResult<bool> {
        let codes = self.codes.read().unwrap_or_else(|e| e.into_inner());
        Ok(codes.contains(short_code))
    }

    async fn health_check(&self) -> bool {
        true
    }
}
