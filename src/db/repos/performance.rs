use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::error::DbResult;

/// Access to `performance_datum` rows for retention.
///
/// Every query takes an optional `repository_id` that narrows it to a single
/// repository's data.
#[async_trait]
pub trait PerformanceDatumRepo: Send + Sync {
    /// Look up a repository id by name.
    async fn repository_id(&self, name: &str) -> DbResult<Option<i64>>;

    /// Highest id among rows pushed strictly after `cutoff`.
    async fn max_id_after(
        &self,
        cutoff: DateTime<Utc>,
        repository_id: Option<i64>,
    ) -> DbResult<Option<i64>>;

    /// Count rows pushed at or before `cutoff` (and with `id <= max_id`, when
    /// given), looking at no more than the first `cap` ids.
    async fn count_at_or_before(
        &self,
        cutoff: DateTime<Utc>,
        max_id: Option<i64>,
        repository_id: Option<i64>,
        cap: u32,
    ) -> DbResult<u64>;

    /// Delete up to `limit` rows pushed before `cutoff`, lowest ids first.
    /// Issues exactly one DELETE statement.
    async fn delete_before(
        &self,
        cutoff: DateTime<Utc>,
        repository_id: Option<i64>,
        limit: u32,
    ) -> DbResult<u64>;
}
