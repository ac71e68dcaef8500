use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::{
    error::DbResult,
    repos::{AncillaryKind, AncillaryRepo},
};

pub struct PostgresAncillaryRepo {
    pool: PgPool,
}

impl PostgresAncillaryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AncillaryRepo for PostgresAncillaryRepo {
    async fn unreferenced_ids(&self, kind: AncillaryKind) -> DbResult<Vec<i64>> {
        let query = format!(
            r#"
            SELECT t.id FROM {table} t
            WHERE NOT EXISTS (SELECT 1 FROM job j WHERE j.{column} = t.id)
            ORDER BY t.id
            "#,
            table = kind.table(),
            column = kind.reference_column(),
        );

        let ids = sqlx::query_scalar(&query).fetch_all(&self.pool).await?;
        Ok(ids)
    }

    async fn delete_unreferenced(&self, kind: AncillaryKind, ids: &[i64]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let query = format!(
            r#"
            DELETE FROM {table}
            WHERE id = ANY($1)
              AND NOT EXISTS (SELECT 1 FROM job WHERE job.{column} = {table}.id)
            "#,
            table = kind.table(),
            column = kind.reference_column(),
        );

        let result = sqlx::query(&query)
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
