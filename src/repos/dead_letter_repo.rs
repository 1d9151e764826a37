/*
 * Responsibility
 * - dead_letters テーブル向け SQLx 操作 (insert only)
 * - DeadLetterSink の Postgres 実装
 */
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::repos::error::{RepoError, RepoResult};
use crate::services::dead_letter::{DeadLetterSink, FailureRecord, SinkError};

/// DB access for dead-letter persistence.
///
/// Request parts, the error description and the principal are stored as JSONB.
#[derive(Clone, Debug)]
pub struct DeadLetterRepo {
    pool: PgPool,
}

impl DeadLetterRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Create the table when it does not exist yet.
    pub async fn ensure_schema(&self) -> RepoResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dead_letters (
                id          UUID PRIMARY KEY,
                created_at  TIMESTAMPTZ NOT NULL,
                method      TEXT NOT NULL,
                url         TEXT NOT NULL,
                status      INTEGER NOT NULL,
                headers     JSONB NOT NULL,
                params      JSONB NOT NULL,
                query       JSONB NOT NULL,
                body        JSONB NOT NULL,
                error       JSONB NOT NULL,
                "user"      JSONB
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(RepoError::Db)?;

        Ok(())
    }

    /// Insert one failure record.
    pub async fn insert(&self, record: &FailureRecord) -> RepoResult<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO dead_letters
                (id, created_at, method, url, status, headers, params, query, body, error, "user")
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(record.id)
        .bind(record.created_at)
        .bind(&record.method)
        .bind(&record.url)
        .bind(i32::from(record.status))
        .bind(Json(&record.headers))
        .bind(Json(&record.params))
        .bind(Json(&record.query))
        .bind(Json(&record.body))
        .bind(Json(&record.error))
        .bind(record.user.as_ref().map(Json))
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::Db)?;

        Ok(id)
    }
}

#[async_trait]
impl DeadLetterSink for DeadLetterRepo {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn create(&self, record: FailureRecord) -> Result<(), SinkError> {
        self.insert(&record).await?;
        Ok(())
    }
}
