//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /api/v1/shortUrl/{code}`
///
/// # Request Flow
///
/// The resolver walks gate, cache, and store in that order; concurrent
/// cache misses for the same code share one store read. See
/// [`crate::application::services::ResolverService`].
///
/// # Errors
///
/// Returns 400 for a code outside the base62 alphabet, 404 when the code
/// was never minted, and 500 when a collaborator fails.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let long_url = state.resolver.resolve(&code).await?;

    debug!("Redirecting {} -> {}", code, long_url);

    // Axum's Redirect helpers emit 303/307/308; short links are permanent
    // moves, so the 301 is built by hand.
    let location = HeaderValue::from_str(&long_url)
        .map_err(|_| AppError::internal("Stored URL is not a valid header value", json!({})))?;

    Ok((StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::{ResolverService, ShortenerService};
    use crate::domain::allocator::IdAllocator;
    use crate::domain::entities::NewMapping;
    use crate::domain::repositories::MappingRepository;
    use crate::infrastructure::cache::MemoryCache;
    use crate::infrastructure::gate::{ExistenceGate, MemoryGate};
    use crate::infrastructure::persistence::MemoryMappingRepository;
    use axum::{Router, routing::get};
    use axum_test::TestServer;
    use std::sync::Arc;

    struct TestApp {
        server: TestServer,
        repository: Arc<MemoryMappingRepository>,
        gate: Arc<MemoryGate>,
    }

    fn test_app() -> TestApp {
        let repository = Arc::new(MemoryMappingRepository::new());
        let cache = Arc::new(MemoryCache::new());
        let gate = Arc::new(MemoryGate::new());
        let allocator = Arc::new(IdAllocator::new(1, "2020-01-01").unwrap());

        let resolver = Arc::new(ResolverService::new(
            repository.clone(),
            cache.clone(),
            gate.clone(),
            3600,
        ));
        let shortener = Arc::new(ShortenerService::new(
            repository.clone(),
            cache.clone(),
            gate.clone(),
            allocator,
            3600,
        ));

        let state = AppState::new(
            resolver,
            shortener,
            repository.clone(),
            cache,
            gate.clone(),
            "https://s.test".to_string(),
        );

        let app = Router::new()
            .route("/shortUrl/{code}", get(redirect_handler))
            .with_state(state);

        TestApp {
            server: TestServer::new(app).unwrap(),
            repository,
            gate,
        }
    }

    async fn seed(app: &TestApp, id: u64, url: &str) -> String {
        let mapping = app
            .repository
            .insert(NewMapping {
                id,
                long_url: url.to_string(),
            })
            .await
            .unwrap();
        app.gate.add(&mapping.short_code()).await.unwrap();
        mapping.short_code()
    }

    #[tokio::test]
    async fn test_redirect_success() {
        let app = test_app();
        let code = seed(&app, 123_456_789, "https://example.com/target").await;

        let response = app.server.get(&format!("/shortUrl/{code}")).await;

        assert_eq!(response.status_code(), 301);
        assert_eq!(response.header("location"), "https://example.com/target");
    }

    #[tokio::test]
    async fn test_redirect_invalid_code_is_bad_request() {
        let app = test_app();

        // Percent-encoded "???" so the question marks stay in the path.
        let response = app.server.get("/shortUrl/%3F%3F%3F").await;
        response.assert_status_bad_request();

        let response = app.server.get("/shortUrl/abc-def").await;
        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_redirect_unknown_code_is_not_found() {
        let app = test_app();

        let response = app.server.get("/shortUrl/8M0kX").await;
        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_redirect_survives_cold_cache() {
        let app = test_app();
        let code = seed(&app, 42, "https://example.com/cold").await;

        // Two consecutive hits: store-backed, then cache-backed.
        for _ in 0..2 {
            let response = app.server.get(&format!("/shortUrl/{code}")).await;
            assert_eq!(response.status_code(), 301);
            assert_eq!(response.header("location"), "https://example.com/cold");
        }
    }
}
