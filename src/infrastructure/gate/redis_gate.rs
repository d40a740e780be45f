//! RedisBloom-backed existence gate.

use super::service::{ExistenceGate, GATE_KEY, GateError, GateResult};
use async_trait::async_trait;
use redis::{Client, aio::ConnectionManager};
use tracing::{debug, info};

/// Existence gate backed by a RedisBloom filter.
///
/// Talks the bloom-filter module commands (`BF.RESERVE`, `BF.ADD`,
/// `BF.EXISTS`) over a shared [`ConnectionManager`]. The filter lives
/// under a single well-known key, so all service instances share one
/// membership set.
pub struct RedisGate {
    client: ConnectionManager,
}

impl RedisGate {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::ConnectionError`] if the URL is invalid, the
    /// connection cannot be established, or the PING health check fails.
    pub async fn connect(redis_url: &str) -> GateResult<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            GateError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| GateError::ConnectionError(format!("Failed to connect to Redis: {}", e)))?;

        let mut test_conn = manager.clone();
        redis::cmd("PING")
            .query_async::<()>(&mut test_conn)
            .await
            .map_err(|e| GateError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis gate");

        Ok(Self { client: manager })
    }
}

#[async_trait]
impl ExistenceGate for RedisGate {
    async fn reserve(&self, capacity: u64, error_rate: f64) -> GateResult<()> {
        let mut conn = self.client.clone();

        let reserved = redis::cmd("BF.RESERVE")
            .arg(GATE_KEY)
            .arg(error_rate)
            .arg(capacity)
            .query_async::<()>(&mut conn)
            .await;

        match reserved {
            Ok(()) => {
                info!(
                    "Gate reserved: capacity {}, error rate {}",
                    capacity, error_rate
                );
                Ok(())
            }
            // An earlier process already reserved the filter.
            Err(e) if e.to_string().contains("item exists") => {
                debug!("Gate already reserved");
                Ok(())
            }
            Err(e) => Err(GateError::OperationError(format!(
                "BF.RESERVE {}: {}",
                GATE_KEY, e
            ))),
        }
    }

    async fn add(&self, short_code: &str) -> GateResult<()> {
        let mut conn = self.client.clone();

        redis::cmd("BF.ADD")
            .arg(GATE_KEY)
            .arg(short_code)
            .query_async::<bool>(&mut conn)
            .await
            .map_err(|e| GateError::OperationError(format!("BF.ADD {}: {}", short_code, e)))?;

        debug!("Gate ADD: {}", short_code);
        Ok(())
    }

    async fn might_exist(&self, short_code: &str) -> GateResult<bool> {
        let mut conn = self.client.clone();

        let exists: bool = redis::cmd("BF.EXISTS")
            .arg(GATE_KEY)
            .arg(short_code)
            .query_async(&mut conn)
            .await
            .map_err(|e| GateError::OperationError(format!("BF.EXISTS {}: {}", short_code, e)))?;

        debug!("Gate CHECK: {} -> {}", short_code, exists);
        Ok(exists)
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        redis::cmd("PING").query_async::<()>(&mut conn).await.is_ok()
    }
}
