use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::error::DbResult;

/// Tables holding rows that belong to a single job through a `job_id`
/// foreign key. They are emptied for a chunk before the jobs themselves.
pub const JOB_DEPENDENT_TABLES: &[&str] = &["job_log", "job_detail"];

#[async_trait]
pub trait JobRepo: Send + Sync {
    // ==================== Retention Operations ====================

    /// Delete one chunk of jobs submitted before `cutoff`, lowest ids first.
    ///
    /// Selects at most `chunk_size` job ids, then deletes their rows in
    /// [`JOB_DEPENDENT_TABLES`] and the jobs in a single transaction.
    /// Returns the number of jobs deleted; fewer than `chunk_size` means
    /// nothing older than `cutoff` is left.
    async fn delete_chunk_before(&self, cutoff: DateTime<Utc>, chunk_size: u32) -> DbResult<u64>;

    /// Count jobs submitted before `cutoff`.
    async fn count_before(&self, cutoff: DateTime<Utc>) -> DbResult<u64>;
}
