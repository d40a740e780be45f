//! PostgreSQL implementation of the mapping repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Mapping, NewMapping};
use crate::domain::repositories::{InsertError, MappingRepository};
use crate::error::{AppError, map_sqlx_error};

const PRIMARY_KEY_CONSTRAINT: &str = "mappings_pkey";
const LONG_URL_CONSTRAINT: &str = "mappings_long_url_key";

/// Row shape of the `mappings` relation.
///
/// Identifiers are stored as `BIGINT`; allocator identifiers keep the sign
/// bit clear for the lifetime of the configured epoch, so the conversion
/// is lossless.
#[derive(sqlx::FromRow)]
struct MappingRow {
    id: i64,
    long_url: String,
    created_at: DateTime<Utc>,
}

impl From<MappingRow> for Mapping {
    fn from(row: MappingRow) -> Self {
        Mapping::new(row.id as u64, row.long_url, row.created_at)
    }
}

/// PostgreSQL repository for mapping storage and retrieval.
///
/// Every operation is a single statement; there is no multi-statement
/// transaction anywhere on the read or write path.
pub struct PgMappingRepository {
    pool: Arc<PgPool>,
}

impl PgMappingRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MappingRepository for PgMappingRepository {
    async fn find_by_id(&self, id: u64) -> Result<Option<Mapping>, AppError> {
        let row = sqlx::query_as::<_, MappingRow>(
            r#"
            SELECT id, long_url, created_at
            FROM mappings
            WHERE id = $1
            "#,
        )
        .bind(id as i64)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Mapping::from))
    }

    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<Mapping>, AppError> {
        let row = sqlx::query_as::<_, MappingRow>(
            r#"
            SELECT id, long_url, created_at
            FROM mappings
            WHERE long_url = $1
            "#,
        )
        .bind(long_url)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Mapping::from))
    }

    async fn insert(&self, new_mapping: NewMapping) -> Result<Mapping, InsertError> {
        if new_mapping.id == 0 {
            return Err(InsertError::Other(AppError::internal(
                "Mapping requires a non-zero identifier",
                json!({}),
            )));
        }
        if new_mapping.long_url.is_empty() {
            return Err(InsertError::Other(AppError::internal(
                "Mapping requires a long URL",
                json!({}),
            )));
        }

        let row = sqlx::query_as::<_, MappingRow>(
            r#"
            INSERT INTO mappings (id, long_url)
            VALUES ($1, $2)
            RETURNING id, long_url, created_at
            "#,
        )
        .bind(new_mapping.id as i64)
        .bind(&new_mapping.long_url)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(classify_insert_error)?;

        Ok(Mapping::from(row))
    }

    async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(self.pool.as_ref())
            .await
            .is_ok()
    }
}

/// Splits unique violations by constraint so the creation flow can react
/// to the two races differently.
fn classify_insert_error(e: sqlx::Error) -> InsertError {
    let violated_constraint = e
        .as_database_error()
        .filter(|db| db.is_unique_violation())
        .and_then(|db| db.constraint())
        .map(str::to_string);

    match violated_constraint.as_deref() {
        Some(PRIMARY_KEY_CONSTRAINT) => InsertError::DuplicateId,
        Some(LONG_URL_CONSTRAINT) => InsertError::DuplicateLongUrl,
        _ => InsertError::Other(map_sqlx_error(e)),
    }
}
