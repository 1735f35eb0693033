#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

pub mod attachments;
pub mod compile;
pub mod github;
pub mod identity;
pub mod jira;
pub mod milestones;
pub mod schedule;
pub mod source;
pub mod submit;
pub mod summary;

pub use attachments::{
    compile_attachments, fetch_attachments, AttachmentDescriptor, AttachmentError,
    AttachmentOptions, AttachmentReport,
};
pub use compile::{
    compile_issue, compile_issues, CommentDraft, CompileError, CompileOptions, DraftStatus,
    IssueDraft, IssueState, MentionSubstituter, StateReason,
};
pub use github::{
    ConfigError, CreateCommentRequest, CreateIssueRequest, CreatedIssue, Credentials,
    GitHubClient, IssueTransport, TransportError, UpdateIssueRequest,
};
pub use identity::{generate_user_map, resolve_mention, UserMap, UserMapEntry};
pub use jira::{fetch_issues, FetchError, JiraQuery, MarkdownPassthrough, RichTextConverter};
pub use milestones::{
    generate_milestone_map, normalize_version, MilestoneMap, MilestoneMapEntry,
};
pub use schedule::{Scheduler, SchedulerConfig};
pub use source::{
    SourceAttachment, SourceComment, SourceIssue, SourceIssueRef, SourceLink, SourceUser,
    SourceVersion,
};
pub use submit::{filter_issues, plan, RetryPolicy, SubmissionEngine, SubmitOptions};
pub use summary::{IssueOutcome, LedgerEntry, MigrationReport, PlannedOperations};
