//! API route configuration.

use crate::api::handlers::{redirect_handler, shorten_handler};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Version 1 API routes.
///
/// # Endpoints
///
/// - `GET  /shortUrl/{code}` - Resolve a short code (301 redirect)
/// - `POST /data/shorten`    - Create a short URL (form-encoded `long_url`)
pub fn v1_routes() -> Router<AppState> {
    Router::new()
        .route("/shortUrl/{code}", get(redirect_handler))
        .route("/data/shorten", post(shorten_handler))
}
