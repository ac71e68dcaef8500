use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::{
    error::DbResult,
    repos::{JOB_DEPENDENT_TABLES, JobRepo},
};

pub struct PostgresJobRepo {
    pool: PgPool,
}

impl PostgresJobRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepo for PostgresJobRepo {
    async fn delete_chunk_before(&self, cutoff: DateTime<Utc>, chunk_size: u32) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;

        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM job
            WHERE submit_time < $1
            ORDER BY id
            LIMIT $2
            "#,
        )
        .bind(cutoff)
        .bind(i64::from(chunk_size))
        .fetch_all(&mut *tx)
        .await?;

        if ids.is_empty() {
            return Ok(0);
        }

        for table in JOB_DEPENDENT_TABLES {
            sqlx::query(&format!("DELETE FROM {table} WHERE job_id = ANY($1)"))
                .bind(&ids)
                .execute(&mut *tx)
                .await?;
        }

        let result = sqlx::query("DELETE FROM job WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected())
    }

    async fn count_before(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job WHERE submit_time < $1")
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
