//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /api/v1/shortUrl/{code}` - Short link redirect
//! - `POST /api/v1/data/shorten`    - Create a short link
//! - `GET  /health`                 - Health check: database, cache, gate
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::health_handler;
use crate::api::middleware::tracing;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router without the outermost path
/// normalization, which cannot wrap a `Router` transparently.
///
/// Useful for tests; production code goes through [`app_router`].
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", api::routes::v1_routes())
        .with_state(state)
        .layer(tracing::layer())
}

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(api_router(state))
}
