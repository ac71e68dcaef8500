use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::{
    error::DbResult,
    repos::{AncillaryKind, AncillaryRepo},
};

pub struct SqliteAncillaryRepo {
    pool: SqlitePool,
}

impl SqliteAncillaryRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AncillaryRepo for SqliteAncillaryRepo {
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

        let table = kind.table();
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("DELETE FROM {table} WHERE id IN ("));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        qb.push(format!(
            " AND NOT EXISTS (SELECT 1 FROM job WHERE job.{} = {table}.id)",
            kind.reference_column()
        ));

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
