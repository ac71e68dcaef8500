use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::{error::DbResult, repos::PerformanceDatumRepo};

pub struct SqlitePerformanceDatumRepo {
    pool: SqlitePool,
}

impl SqlitePerformanceDatumRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn push_repository_filter(qb: &mut QueryBuilder<'_, Sqlite>, repository_id: Option<i64>) {
    if let Some(repository_id) = repository_id {
        qb.push(" AND repository_id = ").push_bind(repository_id);
    }
}

#[async_trait]
impl PerformanceDatumRepo for SqlitePerformanceDatumRepo {
    async fn repository_id(&self, name: &str) -> DbResult<Option<i64>> {
        let id = sqlx::query_scalar("SELECT id FROM repository WHERE name = ?")
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
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT MAX(id) FROM performance_datum WHERE push_timestamp > ");
        qb.push_bind(cutoff);
        push_repository_filter(&mut qb, repository_id);

        let max_id: Option<i64> = qb
            .build_query_scalar()
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
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*) FROM (SELECT id FROM performance_datum WHERE push_timestamp <= ",
        );
        qb.push_bind(cutoff);
        if let Some(max_id) = max_id {
            qb.push(" AND id <= ").push_bind(max_id);
        }
        push_repository_filter(&mut qb, repository_id);
        qb.push(" ORDER BY id LIMIT ")
            .push_bind(i64::from(cap))
            .push(")");

        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn delete_before(
        &self,
        cutoff: DateTime<Utc>,
        repository_id: Option<i64>,
        limit: u32,
    ) -> DbResult<u64> {
        // SQLite has no DELETE ... LIMIT without a compile-time flag
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "DELETE FROM performance_datum WHERE id IN \
             (SELECT id FROM performance_datum WHERE push_timestamp < ",
        );
        qb.push_bind(cutoff);
        push_repository_filter(&mut qb, repository_id);
        qb.push(" ORDER BY id LIMIT ")
            .push_bind(i64::from(limit))
            .push(")");

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
