//! Per-issue outcome types.

use serde::{Deserialize, Serialize};

/// Durable correlation between one migrated issue and its target
/// identifiers. Created only on successful creation; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Link to the source issue.
    pub jira: String,

    /// Link to the created target issue.
    pub github: String,

    /// Target issue number.
    pub number: u64,
}

/// Result of processing a single source issue.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IssueOutcome {
    /// The target issue was created.
    Migrated {
        /// Source issue key.
        key: String,
        /// Target issue number.
        number: u64,
        /// Comments successfully posted.
        comments_posted: usize,
        /// Whether the closing transition succeeded (always false for
        /// issues that stay open).
        closed: bool,
        /// Descriptions of operations that failed after the issue was
        /// created.
        failures: Vec<String>,
    },

    /// Nothing was created for this issue.
    Failed {
        /// Source issue key.
        key: String,
        /// Why compilation or creation failed.
        error: String,
    },
}

impl IssueOutcome {
    /// Whether this outcome carries any failure.
    pub fn has_failures(&self) -> bool {
        match self {
            IssueOutcome::Migrated { failures, .. } => !failures.is_empty(),
            IssueOutcome::Failed { .. } => true,
        }
    }
}
