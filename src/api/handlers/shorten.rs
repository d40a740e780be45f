//! Handler for the link shortening endpoint.

use axum::{Form, Json, extract::State};
use serde_json::json;
use tracing::debug;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Creates (or returns) the short URL for a long URL.
///
/// # Endpoint
///
/// `POST /api/v1/data/shorten` with a form-encoded `long_url` field.
///
/// # Idempotency
///
/// Shortening the same URL twice returns the same short URL; the store's
/// uniqueness constraint backstops concurrent creations.
///
/// # Response
///
/// ```json
/// {
///   "success": true,
///   "short_url": "https://s.example.com/api/v1/shortUrl/8M0kX"
/// }
/// ```
///
/// # Errors
///
/// Returns 400 when `long_url` is missing or not an absolute HTTP(S) URL,
/// and 500 when allocation or a collaborator fails.
pub async fn shorten_handler(
    State(state): State<AppState>,
    Form(payload): Form<ShortenRequest>,
) -> Result<Json<ShortenResponse>, AppError> {
    let long_url = payload
        .long_url
        .ok_or_else(|| AppError::bad_request("long_url is required", json!({})))?;

    let mapping = state.shortener.shorten(&long_url).await?;
    let short_url = state.short_url(&mapping.short_code());

    debug!("Shortened {} -> {}", mapping.long_url, short_url);

    Ok(Json(ShortenResponse::created(short_url)))
}
