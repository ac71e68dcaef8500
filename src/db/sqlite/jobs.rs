use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::{
    error::DbResult,
    repos::{JOB_DEPENDENT_TABLES, JobRepo},
};

pub struct SqliteJobRepo {
    pool: SqlitePool,
}

impl SqliteJobRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// `DELETE FROM {table} WHERE {column} IN (?, ?, ...)`
fn delete_where_in<'a>(table: &str, column: &str, ids: &'a [i64]) -> QueryBuilder<'a, Sqlite> {
    let mut qb = QueryBuilder::new(format!("DELETE FROM {table} WHERE {column} IN ("));
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    qb
}

#[async_trait]
impl JobRepo for SqliteJobRepo {
    async fn delete_chunk_before(&self, cutoff: DateTime<Utc>, chunk_size: u32) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;

        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM job
            WHERE submit_time < ?
            ORDER BY id
            LIMIT ?
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
            delete_where_in(table, "job_id", &ids)
                .build()
                .execute(&mut *tx)
                .await?;
        }

        let result = delete_where_in("job", "id", &ids)
            .build()
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected())
    }

    async fn count_before(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job WHERE submit_time < ?")
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
