//! Target issue drafts.

use serde::Serialize;

/// Target-system state for a migrated issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }
}

/// Reason attached to a closing state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateReason {
    Completed,
    NotPlanned,
}

impl StateReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StateReason::Completed => "completed",
            StateReason::NotPlanned => "not_planned",
        }
    }
}

/// Target state derived from the source status category and resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftStatus {
    pub state: IssueState,
    pub state_reason: Option<StateReason>,
}

/// A not-yet-submitted comment body.
#[derive(Debug, Clone)]
pub struct CommentDraft {
    pub body: String,
}

/// An in-memory target issue, built once per source issue and consumed
/// exactly once by the submission engine.
#[derive(Debug, Clone)]
pub struct IssueDraft {
    pub title: String,
    pub body: String,

    /// Target issue type name, e.g. "Bug" or "Feature".
    pub issue_type: String,

    pub labels: Vec<String>,

    /// Milestone id resolved from the milestone map, when exactly
    /// resolvable.
    pub milestone: Option<String>,

    pub status: DraftStatus,

    /// Comment drafts in original source order.
    pub comments: Vec<CommentDraft>,

    /// Key of the source issue this draft was compiled from.
    pub source_key: String,

    /// Link back to the source issue, after any base-URL override.
    pub source_link: String,
}
