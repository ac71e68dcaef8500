use std::time::Duration;

use super::{DataSource, guard::MaxRuntimeExceeded};
use crate::db::DbError;

/// Counters for one step of a run: a removal strategy, the job deletion loop,
/// or the pruning of one ancillary kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    pub name: String,
    /// Rows deleted by this step.
    pub deleted: u64,
    /// Delete statements issued (or chunk transactions, for jobs).
    pub statements: u32,
    /// Set when the step stopped on a database error.
    pub error: Option<String>,
}

impl StepReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub(crate) fn record_statement(&mut self, deleted: u64) {
        self.statements += 1;
        self.deleted += deleted;
    }

    pub(crate) fn fail(&mut self, error: &DbError) {
        self.error = Some(error.to_string());
    }
}

/// Everything one cycling run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub source: DataSource,
    pub steps: Vec<StepReport>,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            steps: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn push(&mut self, step: StepReport) {
        self.steps.push(step);
    }

    /// Total number of rows deleted across all steps.
    pub fn total_deleted(&self) -> u64 {
        self.steps.iter().map(|s| s.deleted).sum()
    }

    /// Check if any step stopped on an error.
    pub fn has_failures(&self) -> bool {
        self.steps.iter().any(|s| s.error.is_some())
    }

    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// How a run ended, when it did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every step ran. Individual steps may still carry an error.
    Completed(CycleReport),
    /// The runtime guard tripped. Rows deleted before that stay deleted.
    Aborted {
        report: CycleReport,
        reason: MaxRuntimeExceeded,
    },
}

impl CycleOutcome {
    pub fn report(&self) -> &CycleReport {
        match self {
            CycleOutcome::Completed(report) => report,
            CycleOutcome::Aborted { report, .. } => report,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, CycleOutcome::Aborted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_totals() {
        let mut report = CycleReport::new(DataSource::Treeherder);
        let mut jobs = StepReport::new("jobs");
        jobs.record_statement(100);
        jobs.record_statement(50);
        report.push(jobs);
        let mut machines = StepReport::new("prune:machine");
        machines.record_statement(7);
        report.push(machines);

        assert_eq!(report.total_deleted(), 157);
        assert_eq!(report.step("jobs").map(|s| s.statements), Some(2));
        assert!(!report.has_failures());
    }

    #[test]
    fn test_report_failures() {
        let mut report = CycleReport::new(DataSource::Perfherder);
        let mut step = StepReport::new("main");
        step.fail(&DbError::Internal("lost connection".into()));
        report.push(step);

        assert!(report.has_failures());
        assert_eq!(
            report.step("main").and_then(|s| s.error.as_deref()),
            Some("Internal error: lost connection")
        );
    }

    #[test]
    fn test_outcome_report() {
        let report = CycleReport::new(DataSource::Perfherder);
        let outcome = CycleOutcome::Aborted {
            report: report.clone(),
            reason: MaxRuntimeExceeded {
                elapsed: Duration::from_secs(2),
                max_runtime: Duration::from_secs(1),
            },
        };
        assert!(outcome.is_aborted());
        assert_eq!(outcome.report(), &report);
        assert!(!CycleOutcome::Completed(report).is_aborted());
    }
}
