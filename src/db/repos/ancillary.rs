use std::fmt;

use async_trait::async_trait;

use crate::db::error::DbResult;

/// Lookup tables referenced from `job` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AncillaryKind {
    JobType,
    JobGroup,
    Machine,
}

impl AncillaryKind {
    /// Order in which orphans are pruned after a job cycle.
    pub const PRUNE_ORDER: [AncillaryKind; 3] = [
        AncillaryKind::JobType,
        AncillaryKind::JobGroup,
        AncillaryKind::Machine,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            AncillaryKind::JobType => "job_type",
            AncillaryKind::JobGroup => "job_group",
            AncillaryKind::Machine => "machine",
        }
    }

    /// Column on `job` holding the foreign key into [`Self::table`].
    pub fn reference_column(&self) -> &'static str {
        match self {
            AncillaryKind::JobType => "job_type_id",
            AncillaryKind::JobGroup => "job_group_id",
            AncillaryKind::Machine => "machine_id",
        }
    }
}

impl fmt::Display for AncillaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[async_trait]
pub trait AncillaryRepo: Send + Sync {
    /// Ids of `kind` rows not referenced by any job, ascending.
    async fn unreferenced_ids(&self, kind: AncillaryKind) -> DbResult<Vec<i64>>;

    /// Delete the given `kind` rows.
    ///
    /// Rows that gained a referencing job since `ids` was computed are left
    /// alone. Returns the number of rows deleted.
    async fn delete_unreferenced(&self, kind: AncillaryKind, ids: &[i64]) -> DbResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_order() {
        assert_eq!(
            AncillaryKind::PRUNE_ORDER
                .iter()
                .map(|k| k.table())
                .collect::<Vec<_>>(),
            vec!["job_type", "job_group", "machine"]
        );
    }

    #[test]
    fn test_reference_columns() {
        assert_eq!(AncillaryKind::JobType.reference_column(), "job_type_id");
        assert_eq!(AncillaryKind::JobGroup.reference_column(), "job_group_id");
        assert_eq!(AncillaryKind::Machine.reference_column(), "machine_id");
        assert_eq!(AncillaryKind::Machine.to_string(), "machine");
    }
}
