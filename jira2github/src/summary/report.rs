//! Aggregate run report.

use super::outcome::{IssueOutcome, LedgerEntry};
use serde::Serialize;
use std::collections::BTreeMap;

/// Operations a dry run would have scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlannedOperations {
    pub issues: usize,
    pub comments: usize,
    pub closes: usize,
}

/// Aggregate result of a migration run.
///
/// Accumulates per-issue outcomes instead of aborting on the first
/// failure; the ledger holds an entry for every issue that reached the
/// target system.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    /// Source key to target identifiers, for issues actually created.
    pub ledger: BTreeMap<String, LedgerEntry>,

    /// One outcome per processed issue, in processing order.
    pub outcomes: Vec<IssueOutcome>,

    /// Number of issues created.
    pub issues_created: usize,

    /// Number of comments posted.
    pub comments_posted: usize,

    /// Number of closing transitions applied.
    pub issues_closed: usize,

    /// Number of issues for which nothing was created.
    pub issues_failed: usize,

    /// Whether this was a dry run.
    pub dry_run: bool,

    /// Counts a dry run would have scheduled; absent on live runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned: Option<PlannedOperations>,
}

impl MigrationReport {
    /// Creates an empty report.
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    /// Records the outcome of one processed issue.
    pub fn record(&mut self, outcome: IssueOutcome) {
        match &outcome {
            IssueOutcome::Migrated {
                comments_posted,
                closed,
                ..
            } => {
                self.issues_created += 1;
                self.comments_posted += comments_posted;
                if *closed {
                    self.issues_closed += 1;
                }
            }
            IssueOutcome::Failed { .. } => self.issues_failed += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Returns true if any issue or operation failed.
    pub fn has_failures(&self) -> bool {
        self.issues_failed > 0 || self.outcomes.iter().any(IssueOutcome::has_failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_outcomes_into_counters() {
        let mut report = MigrationReport::new(false);

        report.record(IssueOutcome::Migrated {
            key: "T-1".to_string(),
            number: 11,
            comments_posted: 2,
            closed: true,
            failures: vec![],
        });
        report.record(IssueOutcome::Failed {
            key: "T-2".to_string(),
            error: "boom".to_string(),
        });

        assert_eq!(report.issues_created, 1);
        assert_eq!(report.comments_posted, 2);
        assert_eq!(report.issues_closed, 1);
        assert_eq!(report.issues_failed, 1);
        assert!(report.has_failures());
    }

    #[test]
    fn partial_failures_surface() {
        let mut report = MigrationReport::new(false);
        report.record(IssueOutcome::Migrated {
            key: "T-1".to_string(),
            number: 11,
            comments_posted: 1,
            closed: false,
            failures: vec!["comment 2 failed".to_string()],
        });

        assert_eq!(report.issues_failed, 0);
        assert!(report.has_failures());
    }
}
