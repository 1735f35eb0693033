//! Submission engine.
//!
//! Drives the scheduler to create issues, then their comments, then any
//! required closing transition. Each issue moves through
//! Pending -> Created -> CommentsPosted -> (Closed | Done); a failure
//! affects only its own issue or operation, and the run always finishes
//! with an aggregate report.

mod retry;

pub use retry::RetryPolicy;

use crate::compile::{compile_issue, CompileOptions, IssueDraft, IssueState};
use crate::github::{
    CreateCommentRequest, CreateIssueRequest, IssueTransport, UpdateIssueRequest,
};
use crate::schedule::Scheduler;
use crate::source::SourceIssue;
use crate::summary::{IssueOutcome, LedgerEntry, MigrationReport, PlannedOperations};
use crate::{identity::UserMap, milestones::MilestoneMap};
use tracing::{info, info_span, warn, Instrument};

/// Options for one submission run.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Target repository owner.
    pub owner: String,

    /// Target repository name.
    pub repo: String,

    /// When present, only these source keys are processed.
    pub include: Option<Vec<String>>,

    /// Source keys never processed; takes precedence over `include`.
    pub exclude: Option<Vec<String>>,

    /// Report planned operations without performing any request.
    pub dry_run: bool,

    pub compile: CompileOptions,
}

/// Restricts the working set to the configured include/exclude lists.
pub fn filter_issues<'a>(issues: &'a [SourceIssue], options: &SubmitOptions) -> Vec<&'a SourceIssue> {
    issues
        .iter()
        .filter(|issue| match &options.include {
            Some(include) => include.iter().any(|key| *key == issue.key),
            None => true,
        })
        .filter(|issue| match &options.exclude {
            Some(exclude) => !exclude.iter().any(|key| *key == issue.key),
            None => true,
        })
        .collect()
}

/// Reports what a run over `issues` would schedule, without performing
/// any request. Compile failures still surface as failed outcomes.
pub fn plan(
    issues: &[SourceIssue],
    user_map: &UserMap,
    milestone_map: &MilestoneMap,
    options: &SubmitOptions,
) -> MigrationReport {
    let working = filter_issues(issues, options);
    let mut report = MigrationReport::new(true);
    let mut planned = PlannedOperations::default();

    for issue in working {
        match compile_issue(issue, user_map, milestone_map, &options.compile) {
            Ok(draft) => {
                planned.issues += 1;
                planned.comments += draft.comments.len();
                if draft.status.state == IssueState::Closed {
                    planned.closes += 1;
                }
            }
            Err(error) => {
                warn!(key = %issue.key, error = %error, "Issue cannot be compiled");
                report.record(IssueOutcome::Failed {
                    key: issue.key.clone(),
                    error: error.to_string(),
                });
            }
        }
    }

    report.planned = Some(planned);
    report
}

/// Drives scheduled issue creation against an [`IssueTransport`].
pub struct SubmissionEngine<T: IssueTransport> {
    transport: T,
    scheduler: Scheduler,
    retry: RetryPolicy,
}

impl<T: IssueTransport> SubmissionEngine<T> {
    /// Creates an engine owning its scheduler and retry policy.
    ///
    /// One engine (and so one scheduler) exists per run; nothing here is
    /// shared globally.
    pub fn new(transport: T, scheduler: Scheduler, retry: RetryPolicy) -> Self {
        Self {
            transport,
            scheduler,
            retry,
        }
    }

    /// Returns the transport the engine drives.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submits the filtered issue set to the target system.
    ///
    /// In dry-run mode this delegates to [`plan`] and performs no
    /// requests. Otherwise every issue is compiled and submitted in
    /// order; failures are accumulated into the report rather than
    /// aborting the run.
    pub async fn submit(
        &self,
        issues: &[SourceIssue],
        user_map: &UserMap,
        milestone_map: &MilestoneMap,
        options: &SubmitOptions,
    ) -> MigrationReport {
        if options.dry_run {
            return plan(issues, user_map, milestone_map, options);
        }

        let working = filter_issues(issues, options);
        info!(count = working.len(), "Submitting issues");

        let mut report = MigrationReport::new(false);
        for issue in working {
            let draft = match compile_issue(issue, user_map, milestone_map, &options.compile) {
                Ok(draft) => draft,
                Err(error) => {
                    warn!(key = %issue.key, error = %error, "Skipping uncompilable issue");
                    report.record(IssueOutcome::Failed {
                        key: issue.key.clone(),
                        error: error.to_string(),
                    });
                    continue;
                }
            };

            let span = info_span!("submit_issue", key = %draft.source_key);
            let (entry, outcome) = self
                .submit_draft(draft, options)
                .instrument(span)
                .await;
            if let Some((key, entry)) = entry {
                report.ledger.insert(key, entry);
            }
            report.record(outcome);
        }

        info!(
            created = report.issues_created,
            failed = report.issues_failed,
            "Submission finished"
        );
        report
    }

    /// Runs one draft through the per-issue state machine.
    async fn submit_draft(
        &self,
        draft: IssueDraft,
        options: &SubmitOptions,
    ) -> (Option<(String, LedgerEntry)>, IssueOutcome) {
        // Pending -> Created
        let request = CreateIssueRequest {
            owner: options.owner.clone(),
            repo: options.repo.clone(),
            title: draft.title.clone(),
            body: draft.body.clone(),
            labels: draft.labels.clone(),
            issue_type: draft.issue_type.clone(),
            milestone: draft
                .milestone
                .as_deref()
                .and_then(|id| id.parse().ok()),
        };

        let created = match self
            .retry
            .execute(|| self.scheduler.run(|| self.transport.create_issue(&request)))
            .await
        {
            Ok(created) => created,
            Err(error) => {
                warn!(error = %error, "Issue creation failed");
                return (
                    None,
                    IssueOutcome::Failed {
                        key: draft.source_key,
                        error: error.to_string(),
                    },
                );
            }
        };
        info!(number = created.number, "Issue created");

        let entry = LedgerEntry {
            jira: draft.source_link.clone(),
            github: created.html_url.clone(),
            number: created.number,
        };

        // Created -> CommentsPosted, in original order.
        let mut comments_posted = 0;
        let mut failures = Vec::new();
        for (index, comment) in draft.comments.iter().enumerate() {
            let request = CreateCommentRequest {
                owner: options.owner.clone(),
                repo: options.repo.clone(),
                issue_number: created.number,
                body: comment.body.clone(),
            };

            match self
                .retry
                .execute(|| self.scheduler.run(|| self.transport.create_comment(&request)))
                .await
            {
                Ok(()) => comments_posted += 1,
                Err(error) => {
                    warn!(comment = index + 1, error = %error, "Comment failed");
                    failures.push(format!("comment {} failed: {error}", index + 1));
                }
            }
        }

        // CommentsPosted -> Closed | Done
        let mut closed = false;
        if draft.status.state == IssueState::Closed {
            let request = UpdateIssueRequest {
                owner: options.owner.clone(),
                repo: options.repo.clone(),
                issue_number: created.number,
                state: draft.status.state.as_str().to_string(),
                state_reason: draft
                    .status
                    .state_reason
                    .map(|reason| reason.as_str().to_string()),
            };

            match self
                .retry
                .execute(|| self.scheduler.run(|| self.transport.update_issue(&request)))
                .await
            {
                Ok(()) => closed = true,
                Err(error) => {
                    warn!(error = %error, "Closing transition failed");
                    failures.push(format!("close failed: {error}"));
                }
            }
        }

        (
            Some((draft.source_key.clone(), entry)),
            IssueOutcome::Migrated {
                key: draft.source_key,
                number: created.number,
                comments_posted,
                closed,
                failures,
            },
        )
    }
}
