use thiserror::Error;

/// Database error codes that signal lock contention or a cancelled statement
/// rather than a broken query or schema. Covers SQLite (primary and extended
/// `BUSY`/`LOCKED` codes), PostgreSQL SQLSTATEs and MySQL error numbers.
const TRANSIENT_CODES: &[&str] = &[
    // SQLite
    "5", "6", "261", "262", "517", "518", "773",
    // PostgreSQL: serialization_failure, deadlock_detected, lock_not_available, query_canceled
    "40001", "40P01", "55P03", "57014",
    // MySQL: lock wait timeout, deadlock
    "1205", "1213",
];

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database not configured")]
    NotConfigured,

    #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DbError {
    /// Whether retrying the same statement later could succeed.
    ///
    /// Lock waits, deadlocks, pool timeouts and dropped connections are
    /// transient. Anything else (bad SQL, missing table, constraint
    /// violation) will fail the same way on the next attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
            DbError::Sqlx(e) => match e {
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
                sqlx::Error::Database(db) => db
                    .code()
                    .is_some_and(|code| TRANSIENT_CODES.contains(&code.as_ref())),
                _ => false,
            },
            _ => false,
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(DbError::Sqlx(sqlx::Error::PoolTimedOut).is_transient());
    }

    #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
    #[test]
    fn test_io_error_is_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(DbError::Sqlx(sqlx::Error::Io(io)).is_transient());
    }

    #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
    #[test]
    fn test_row_not_found_is_not_transient() {
        assert!(!DbError::Sqlx(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn test_sqlite_busy_and_locked_families_are_transient() {
        for code in ["5", "261", "517", "773", "6", "262", "518"] {
            assert!(TRANSIENT_CODES.contains(&code), "missing {code}");
        }
    }

    #[test]
    fn test_non_sqlx_errors_are_not_transient() {
        assert!(!DbError::NotConfigured.is_transient());
        assert!(!DbError::Internal("boom".into()).is_transient());
    }

    #[cfg(feature = "database-sqlite")]
    #[tokio::test]
    async fn test_missing_table_is_not_transient() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory SQLite pool");

        let err: DbError = sqlx::query("DELETE FROM no_such_table")
            .execute(&pool)
            .await
            .unwrap_err()
            .into();
        assert!(!err.is_transient());
    }
}
