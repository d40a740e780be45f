//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Components Checked
///
/// 1. **Database**: single-statement probe through the repository
/// 2. **Cache**: Redis PING (always healthy when caching is disabled)
/// 3. **Gate**: Redis PING (always healthy when filtering is disabled)
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let database = if state.repository.health_check().await {
        CheckStatus::ok()
    } else {
        CheckStatus::degraded("Database unreachable")
    };

    let cache = if state.cache.health_check().await {
        CheckStatus::ok()
    } else {
        CheckStatus::degraded("Cache unreachable")
    };

    let gate = if state.gate.health_check().await {
        CheckStatus::ok()
    } else {
        CheckStatus::degraded("Gate unreachable")
    };

    let all_healthy = database.is_ok() && cache.is_ok() && gate.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            database,
            cache,
            gate,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
