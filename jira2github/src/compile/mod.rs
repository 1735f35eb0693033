//! Issue compilation.
//!
//! Pure transformation from a normalized source issue plus the resolved
//! identity and milestone maps into a target issue draft. Never consults
//! network state; every input is an already-resolved map.

mod body;
mod draft;
mod error;
mod mentions;

pub use draft::{CommentDraft, DraftStatus, IssueDraft, IssueState, StateReason};
pub use error::CompileError;
pub use mentions::MentionSubstituter;

use crate::identity::{resolve_mention, UserMap};
use crate::milestones::{coerce_version, MilestoneMap};
use crate::source::SourceIssue;
use body::{compile_body, format_long_date};
use semver::Version;

/// Options consumed by the compiler, owned by the caller's configuration
/// layer.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Prefix titles with the source key, as in "[FLUID-1] Summary".
    pub include_key_in_title: bool,

    /// Override base for links back to the source issue.
    pub issue_base_url: Option<String>,

    /// Base URL for attachment links; attachments render as plain
    /// filenames without it.
    pub attachment_base_url: Option<String>,

    /// Target type used when the source type has no mapping. Without it
    /// an unmapped type fails compilation for that issue.
    pub fallback_type: Option<String>,

    /// Normalize version labels to semantic versions for milestone
    /// lookup.
    pub semantic_versions: bool,
}

/// Fixed lookup from source issue-type name to target type and label.
fn map_issue_type(name: &str) -> Option<(&'static str, &'static str)> {
    match name {
        "Task" | "Sub-task" => Some(("Task", "enhancement")),
        "New Feature" | "Improvement" => Some(("Feature", "enhancement")),
        "Design" => Some(("Feature", "design")),
        "Bug" | "Sub-issue" => Some(("Bug", "bug")),
        _ => None,
    }
}

/// Resolutions that close an issue as completed; everything else present
/// maps to "not planned".
fn classify_resolution(resolution: &str) -> StateReason {
    match resolution {
        "Done" | "Fixed" | "Resolved" => StateReason::Completed,
        _ => StateReason::NotPlanned,
    }
}

/// Picks the milestone id for an issue's fix versions.
///
/// A single fix version is normalized and looked up directly; with
/// several, the highest semantic version wins. A lookup miss, an
/// operator value left empty, or an uncoercible label all yield no
/// milestone rather than an error.
fn select_milestone(
    issue: &SourceIssue,
    milestone_map: &MilestoneMap,
    options: &CompileOptions,
) -> Option<String> {
    let key = if options.semantic_versions {
        let mut versions: Vec<Version> = issue
            .fix_versions
            .iter()
            .filter_map(|version| coerce_version(&version.name))
            .collect();
        versions.sort();
        versions.pop()?.to_string()
    } else {
        issue
            .fix_versions
            .iter()
            .map(|version| version.name.clone())
            .max()?
    };

    milestone_map
        .get(&key)
        .filter(|id| !id.is_empty())
        .cloned()
}

/// Compiles one source issue into a target issue draft.
///
/// # Errors
///
/// Returns [`CompileError::UnmappedType`] when the issue type has no
/// mapping and no fallback type is configured.
pub fn compile_issue(
    issue: &SourceIssue,
    user_map: &UserMap,
    milestone_map: &MilestoneMap,
    options: &CompileOptions,
) -> Result<IssueDraft, CompileError> {
    let substituter = MentionSubstituter::new(user_map);
    compile_with_substituter(issue, user_map, milestone_map, options, &substituter)
}

/// Compiles a batch of source issues, reusing one mention substituter.
///
/// Returns one result per input issue, in input order; a mapping failure
/// affects only its own issue.
pub fn compile_issues(
    issues: &[SourceIssue],
    user_map: &UserMap,
    milestone_map: &MilestoneMap,
    options: &CompileOptions,
) -> Vec<Result<IssueDraft, CompileError>> {
    let substituter = MentionSubstituter::new(user_map);
    issues
        .iter()
        .map(|issue| compile_with_substituter(issue, user_map, milestone_map, options, &substituter))
        .collect()
}

fn compile_with_substituter(
    issue: &SourceIssue,
    user_map: &UserMap,
    milestone_map: &MilestoneMap,
    options: &CompileOptions,
    substituter: &MentionSubstituter,
) -> Result<IssueDraft, CompileError> {
    let (issue_type, type_label) = match map_issue_type(&issue.issue_type) {
        Some((issue_type, label)) => (issue_type.to_string(), Some(label)),
        None => match &options.fallback_type {
            Some(fallback) => (fallback.clone(), None),
            None => {
                return Err(CompileError::UnmappedType {
                    key: issue.key.clone(),
                    issue_type: issue.issue_type.clone(),
                })
            }
        },
    };

    let mut labels: Vec<String> = type_label.map(str::to_string).into_iter().collect();
    if issue.labels.iter().any(|label| label == "accessibility") {
        labels.push("accessibility".to_string());
    }

    let source_link = match &options.issue_base_url {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), issue.key),
        None => issue.link.clone(),
    };

    let title = if options.include_key_in_title {
        format!("[{}] {}", issue.key, issue.summary)
    } else {
        issue.summary.clone()
    };

    let state = if issue.is_terminal() {
        IssueState::Closed
    } else {
        IssueState::Open
    };
    let state_reason = issue
        .resolution
        .as_deref()
        .map(classify_resolution);

    let comments = issue
        .comments
        .iter()
        .map(|comment| {
            let author = comment
                .author
                .as_ref()
                .map(|author| resolve_mention(&author.account_id, user_map))
                .unwrap_or_default();
            let preamble = format!(
                "Comment migrated from [{key}]({link}?focusedCommentId={id}). Originally posted by {author} on {date}.",
                key = issue.key,
                link = source_link,
                id = comment.id,
                date = format_long_date(&comment.created),
            );
            CommentDraft {
                body: format!("{preamble}\n\n{}", substituter.substitute(&comment.body)),
            }
        })
        .collect();

    Ok(IssueDraft {
        title,
        body: compile_body(issue, user_map, options, &source_link),
        issue_type,
        labels,
        milestone: select_milestone(issue, milestone_map, options),
        status: DraftStatus {
            state,
            state_reason,
        },
        comments,
        source_key: issue.key.clone(),
        source_link,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UserMapEntry;
    use crate::source::{
        SourceAttachment, SourceComment, SourceIssueRef, SourceLink, SourceUser, SourceVersion,
    };

    fn base_issue() -> SourceIssue {
        SourceIssue {
            key: "FLUID-100".to_string(),
            link: "https://tracker.example.com/browse/FLUID-100".to_string(),
            project_key: "FLUID".to_string(),
            summary: "Keyboard trap in dialog".to_string(),
            description: "The dialog cannot be escaped.".to_string(),
            environment: None,
            components: vec![],
            creator: None,
            assignee: None,
            reporter: Some(SourceUser {
                account_id: "alice-id".to_string(),
                display_name: "Alice".to_string(),
                self_link: "https://tracker.example.com/user/alice-id".to_string(),
            }),
            comments: vec![],
            attachments: vec![],
            issue_type: "Bug".to_string(),
            labels: vec![],
            issue_links: vec![],
            subtasks: vec![],
            parent: None,
            versions: vec![],
            fix_versions: vec![],
            status_category: "To Do".to_string(),
            resolution: None,
            created: "2019-07-05T10:00:00.000+0000".to_string(),
        }
    }

    fn user_map() -> UserMap {
        let mut map = UserMap::new();
        map.insert(
            "alice-id".to_string(),
            UserMapEntry {
                name: "Alice".to_string(),
                link: String::new(),
                github: "alice".to_string(),
            },
        );
        map
    }

    fn options() -> CompileOptions {
        CompileOptions {
            semantic_versions: true,
            ..CompileOptions::default()
        }
    }

    #[test]
    fn maps_known_types_and_labels() {
        let mut issue = base_issue();
        issue.issue_type = "Improvement".to_string();
        issue.labels = vec!["accessibility".to_string(), "other".to_string()];

        let draft =
            compile_issue(&issue, &user_map(), &MilestoneMap::new(), &options()).unwrap();

        assert_eq!(draft.issue_type, "Feature");
        assert_eq!(draft.labels, vec!["enhancement", "accessibility"]);
    }

    #[test]
    fn unmapped_type_fails_without_fallback() {
        let mut issue = base_issue();
        issue.issue_type = "Epic".to_string();

        let result = compile_issue(&issue, &user_map(), &MilestoneMap::new(), &options());
        assert!(matches!(
            result,
            Err(CompileError::UnmappedType { ref issue_type, .. }) if issue_type == "Epic"
        ));
    }

    #[test]
    fn unmapped_type_uses_configured_fallback() {
        let mut issue = base_issue();
        issue.issue_type = "Epic".to_string();
        let mut opts = options();
        opts.fallback_type = Some("Task".to_string());

        let draft = compile_issue(&issue, &user_map(), &MilestoneMap::new(), &opts).unwrap();
        assert_eq!(draft.issue_type, "Task");
        assert!(draft.labels.is_empty());
    }

    #[test]
    fn title_includes_key_when_configured() {
        let issue = base_issue();
        let mut opts = options();
        opts.include_key_in_title = true;

        let draft = compile_issue(&issue, &user_map(), &MilestoneMap::new(), &opts).unwrap();
        assert_eq!(draft.title, "[FLUID-100] Keyboard trap in dialog");

        let bare = compile_issue(&issue, &user_map(), &MilestoneMap::new(), &options()).unwrap();
        assert_eq!(bare.title, "Keyboard trap in dialog");
    }

    #[test]
    fn body_carries_provenance_and_sections() {
        let mut issue = base_issue();
        issue.components = vec!["Renderer".to_string()];
        issue.environment = Some("Firefox 60".to_string());
        issue.attachments = vec![SourceAttachment {
            filename: "trace.log".to_string(),
            size: 10,
            mime_type: None,
            content: "https://tracker.example.com/attachment/1".to_string(),
        }];
        issue.subtasks = vec![SourceIssueRef {
            key: "FLUID-101".to_string(),
            summary: "part one".to_string(),
        }];
        issue.parent = Some(SourceIssueRef {
            key: "FLUID-90".to_string(),
            summary: "parent".to_string(),
        });
        issue.issue_links = vec![
            SourceLink {
                relation: "blocks".to_string(),
                key: "FLUID-7".to_string(),
                summary: String::new(),
            },
            SourceLink {
                relation: "blocks".to_string(),
                key: "FLUID-8".to_string(),
                summary: String::new(),
            },
        ];

        let mut opts = options();
        opts.attachment_base_url = Some("https://files.example.com/".to_string());

        let draft = compile_issue(&issue, &user_map(), &MilestoneMap::new(), &opts).unwrap();

        assert!(draft.body.starts_with("The dialog cannot be escaped."));
        assert!(draft.body.contains("## Components\n\n- Renderer"));
        assert!(draft.body.contains("## Details\n\nFirefox 60"));
        assert!(draft.body.contains(
            "Originally filed as [FLUID-100](https://tracker.example.com/browse/FLUID-100) by @alice on July 5, 2019."
        ));
        assert!(draft.body.contains(
            "[trace.log](https://files.example.com/FLUID/FLUID-100/trace.log)"
        ));
        assert!(draft.body.contains(
            "### Subtasks\n\n- [FLUID-101](https://tracker.example.com/browse/FLUID-101)"
        ));
        assert!(draft.body.contains(
            "### Parent\n\n[FLUID-90](https://tracker.example.com/browse/FLUID-90)"
        ));
        assert!(draft.body.contains("- blocks\n  - [FLUID-7]"));
        assert!(draft.body.contains("  - [FLUID-8]"));
    }

    #[test]
    fn issue_base_url_overrides_source_link() {
        let issue = base_issue();
        let mut opts = options();
        opts.issue_base_url = Some("https://issues.example.org/browse".to_string());

        let draft = compile_issue(&issue, &user_map(), &MilestoneMap::new(), &opts).unwrap();
        assert_eq!(
            draft.source_link,
            "https://issues.example.org/browse/FLUID-100"
        );
        assert!(draft
            .body
            .contains("[FLUID-100](https://issues.example.org/browse/FLUID-100)"));
    }

    #[test]
    fn terminal_status_closes_with_reason() {
        let mut issue = base_issue();
        issue.status_category = "Done".to_string();
        issue.resolution = Some("Fixed".to_string());

        let draft = compile_issue(&issue, &user_map(), &MilestoneMap::new(), &options()).unwrap();
        assert_eq!(draft.status.state, IssueState::Closed);
        assert_eq!(draft.status.state_reason, Some(StateReason::Completed));

        issue.resolution = Some("Won't Do".to_string());
        let draft = compile_issue(&issue, &user_map(), &MilestoneMap::new(), &options()).unwrap();
        assert_eq!(draft.status.state_reason, Some(StateReason::NotPlanned));
    }

    #[test]
    fn single_fix_version_resolves_milestone() {
        let mut issue = base_issue();
        issue.fix_versions = vec![SourceVersion {
            name: "2.0beta".to_string(),
        }];
        let mut milestones = MilestoneMap::new();
        milestones.insert("2.0.0-beta.0".to_string(), "5".to_string());

        let draft = compile_issue(&issue, &user_map(), &milestones, &options()).unwrap();
        assert_eq!(draft.milestone.as_deref(), Some("5"));
    }

    #[test]
    fn highest_fix_version_wins() {
        let mut issue = base_issue();
        issue.fix_versions = vec![
            SourceVersion {
                name: "1.4".to_string(),
            },
            SourceVersion {
                name: "2.0beta".to_string(),
            },
            SourceVersion {
                name: "1.9.1".to_string(),
            },
        ];
        let mut milestones = MilestoneMap::new();
        milestones.insert("1.4.0".to_string(), "1".to_string());
        milestones.insert("2.0.0-beta.0".to_string(), "9".to_string());

        let draft = compile_issue(&issue, &user_map(), &milestones, &options()).unwrap();
        assert_eq!(draft.milestone.as_deref(), Some("9"));
    }

    #[test]
    fn unresolved_milestone_is_not_an_error() {
        let mut issue = base_issue();
        issue.fix_versions = vec![SourceVersion {
            name: "3.0".to_string(),
        }];

        // Missing from the map entirely.
        let draft = compile_issue(&issue, &user_map(), &MilestoneMap::new(), &options()).unwrap();
        assert!(draft.milestone.is_none());

        // Present but left empty by the operator.
        let mut milestones = MilestoneMap::new();
        milestones.insert("3.0.0".to_string(), String::new());
        let draft = compile_issue(&issue, &user_map(), &milestones, &options()).unwrap();
        assert!(draft.milestone.is_none());
    }

    #[test]
    fn comments_carry_preamble_and_substituted_mentions() {
        let mut issue = base_issue();
        issue.comments = vec![SourceComment {
            id: "42".to_string(),
            author: Some(SourceUser {
                account_id: "alice-id".to_string(),
                display_name: "Alice".to_string(),
                self_link: String::new(),
            }),
            update_author: None,
            created: "2020-03-02T08:00:00.000+0000".to_string(),
            body: "Agreed with @Alice here.".to_string(),
        }];

        let draft = compile_issue(&issue, &user_map(), &MilestoneMap::new(), &options()).unwrap();
        assert_eq!(draft.comments.len(), 1);
        let body = &draft.comments[0].body;
        assert!(body.starts_with(
            "Comment migrated from [FLUID-100](https://tracker.example.com/browse/FLUID-100?focusedCommentId=42). Originally posted by @alice on March 2, 2020."
        ));
        assert!(body.ends_with("Agreed with @alice here."));
    }
}
