use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::{error::DbResult, repos::PerformanceDatumRepo};

pub struct PostgresPerformanceDatumRepo {
    pool: PgPool,
}

impl PostgresPerformanceDatumRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// A NULL `repository_id` parameter disables the repository filter, so each
// query keeps a single prepared form.
#[async_trait]
impl PerformanceDatumRepo for PostgresPerformanceDatumRepo {
    async fn repository_id(&self, name: &str) -> DbResult<Option<i64>> {
        let id = sqlx::query_scalar("SELECT id FROM repository WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn max_id_after(
        &self,
        cutoff: DateTime<Utc>,
        repository_id: Option<i64>,
    ) -> DbResult<Option<i64>> {
        let max_id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT MAX(id) FROM performance_datum
            WHERE push_timestamp > $1
              AND ($2::BIGINT IS NULL OR repository_id = $2)
            "#,
        )
        .bind(cutoff)
        .bind(repository_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(max_id)
    }

    async fn count_at_or_before(
        &self,
        cutoff: DateTime<Utc>,
        max_id: Option<i64>,
        repository_id: Option<i64>,
        cap: u32,
    ) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM (
                SELECT id FROM performance_datum
                WHERE push_timestamp <= $1
                  AND ($2::BIGINT IS NULL OR id <= $2)
                  AND ($3::BIGINT IS NULL OR repository_id = $3)
                ORDER BY id
                LIMIT $4
            ) AS older
            "#,
        )
        .bind(cutoff)
        .bind(max_id)
        .bind(repository_id)
        .bind(i64::from(cap))
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn delete_before(
        &self,
        cutoff: DateTime<Utc>,
        repository_id: Option<i64>,
        limit: u32,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM performance_datum
            WHERE id IN (
                SELECT id FROM performance_datum
                WHERE push_timestamp < $1
                  AND ($2::BIGINT IS NULL OR repository_id = $2)
                ORDER BY id
                LIMIT $3
            )
            "#,
        )
        .bind(cutoff)
        .bind(repository_id)
        .bind(i64::from(limit))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
