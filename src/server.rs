//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache and gate setup, allocator
//! construction, and the Axum server lifecycle.

use crate::application::services::{ResolverService, ShortenerService};
use crate::config::Config;
use crate::domain::allocator::IdAllocator;
use crate::domain::repositories::MappingRepository;
use crate::infrastructure::cache::{LookupCache, NullCache, RedisCache};
use crate::infrastructure::gate::{ExistenceGate, NullGate, RedisGate};
use crate::infrastructure::persistence::PgMappingRepository;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool and migrations
/// - Redis cache (or NullCache fallback)
/// - RedisBloom existence gate, reserved once (or NullGate fallback)
/// - Identifier allocator
/// - Axum HTTP server with graceful shutdown
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - The allocator configuration is invalid
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let cache = connect_cache(&config).await;
    let gate = connect_gate(&config).await;

    let allocator = Arc::new(
        IdAllocator::new(config.id_gen_node_id, &config.id_gen_epoch_date)
            .context("Invalid allocator configuration")?,
    );

    let repository: Arc<dyn MappingRepository> =
        Arc::new(PgMappingRepository::new(Arc::new(pool)));

    let resolver = Arc::new(ResolverService::new(
        repository.clone(),
        cache.clone(),
        gate.clone(),
        config.cache_ttl_seconds,
    ));
    let shortener = Arc::new(ShortenerService::new(
        repository.clone(),
        cache.clone(),
        gate.clone(),
        allocator,
        config.cache_ttl_seconds,
    ));

    let state = AppState::new(
        resolver,
        shortener,
        repository,
        cache,
        gate,
        config.short_url_prefix.clone(),
    );

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Connects the Redis cache, falling back to a no-op cache when Redis is
/// unavailable.
async fn connect_cache(config: &Config) -> Arc<dyn LookupCache> {
    if let Some(redis_url) = &config.redis_url {
        match RedisCache::connect(redis_url).await {
            Ok(redis) => {
                tracing::info!("Cache enabled (Redis)");
                return Arc::new(redis);
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
            }
        }
    } else {
        tracing::info!("Cache disabled (NullCache)");
    }

    Arc::new(NullCache::new())
}

/// Connects and reserves the RedisBloom gate, falling back to a
/// pass-through gate that reports every code as possibly existing.
async fn connect_gate(config: &Config) -> Arc<dyn ExistenceGate> {
    if let Some(redis_url) = &config.redis_url {
        match RedisGate::connect(redis_url).await {
            Ok(gate) => {
                match gate
                    .reserve(config.bloom_capacity, config.bloom_error_rate)
                    .await
                {
                    Ok(()) => {
                        tracing::info!("Existence gate enabled (RedisBloom)");
                        return Arc::new(gate);
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Failed to reserve existence filter: {}. Using NullGate.",
                            e
                        );
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using NullGate.", e);
            }
        }
    } else {
        tracing::info!("Existence gate disabled (NullGate)");
    }

    Arc::new(NullGate::new())
}

/// Resolves when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
