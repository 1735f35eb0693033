//! Normalized source issue records.
//!
//! Every downstream stage consumes this one shape, regardless of how the
//! export was produced. Rich-text fields are already markdown by the time
//! a [`SourceIssue`] exists; the records are read-only after construction.

use serde::{Deserialize, Serialize};

/// A user reference as it appears on an issue or comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUser {
    /// Stable account identifier in the source tracker.
    #[serde(rename = "accountId")]
    pub account_id: String,

    /// Human-readable name.
    #[serde(rename = "displayName")]
    pub display_name: String,

    /// Link to the user's profile resource.
    #[serde(rename = "self", default)]
    pub self_link: String,
}

/// A single comment on a source issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceComment {
    pub id: String,
    pub author: Option<SourceUser>,
    #[serde(rename = "updateAuthor")]
    pub update_author: Option<SourceUser>,
    pub created: String,
    /// Comment body, pre-converted to markdown.
    pub body: String,
}

/// An attachment descriptor on a source issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAttachment {
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "mimeType", default)]
    pub mime_type: Option<String>,
    /// Download location for the attachment content.
    pub content: String,
}

/// A typed link to a related issue, flattened to its relation description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceLink {
    /// Relation description, e.g. "blocks" or "is duplicated by".
    pub relation: String,
    pub key: String,
    #[serde(default)]
    pub summary: String,
}

/// A reference to a subtask or parent issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceIssueRef {
    pub key: String,
    #[serde(default)]
    pub summary: String,
}

/// A named version from the source tracker's `versions`/`fixVersions` fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceVersion {
    pub name: String,
}

/// A fully normalized issue from the source tracker.
///
/// Produced once by the reader (file import or paginated fetch) and never
/// mutated downstream. All optional structure is expressed through named
/// optional fields rather than presence checks on a document tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceIssue {
    /// Issue key, e.g. "FLUID-6234".
    pub key: String,

    /// Browse link to the issue on the source tracker.
    pub link: String,

    /// Key of the project the issue belongs to.
    #[serde(rename = "projectKey", default)]
    pub project_key: String,

    pub summary: String,

    /// Description, pre-converted to markdown.
    #[serde(default)]
    pub description: String,

    /// Environment field, pre-converted to markdown.
    #[serde(default)]
    pub environment: Option<String>,

    /// Component names the issue is filed against.
    #[serde(default)]
    pub components: Vec<String>,

    pub creator: Option<SourceUser>,
    pub assignee: Option<SourceUser>,
    pub reporter: Option<SourceUser>,

    #[serde(default)]
    pub comments: Vec<SourceComment>,

    #[serde(default)]
    pub attachments: Vec<SourceAttachment>,

    /// Issue type name, e.g. "Bug" or "New Feature".
    #[serde(rename = "issueType")]
    pub issue_type: String,

    #[serde(default)]
    pub labels: Vec<String>,

    #[serde(rename = "issueLinks", default)]
    pub issue_links: Vec<SourceLink>,

    #[serde(default)]
    pub subtasks: Vec<SourceIssueRef>,

    pub parent: Option<SourceIssueRef>,

    #[serde(default)]
    pub versions: Vec<SourceVersion>,

    #[serde(rename = "fixVersions", default)]
    pub fix_versions: Vec<SourceVersion>,

    /// Status category name; "Done" marks the terminal category.
    #[serde(rename = "statusCategory", default)]
    pub status_category: String,

    /// Resolution name, present only on resolved issues.
    #[serde(default)]
    pub resolution: Option<String>,

    /// Creation timestamp as reported by the source tracker.
    pub created: String,
}

impl SourceIssue {
    /// Returns true when the issue sits in the terminal status category.
    pub fn is_terminal(&self) -> bool {
        self.status_category == "Done"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_issue() {
        let json = r#"{
            "key": "FLUID-1",
            "link": "https://tracker.example.com/browse/FLUID-1",
            "summary": "A bug",
            "creator": null,
            "assignee": null,
            "reporter": null,
            "parent": null,
            "issueType": "Bug",
            "created": "2019-07-05T10:00:00.000+0000"
        }"#;

        let issue: SourceIssue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.key, "FLUID-1");
        assert!(issue.comments.is_empty());
        assert!(issue.fix_versions.is_empty());
        assert!(!issue.is_terminal());
    }

    #[test]
    fn terminal_category_is_done() {
        let json = r#"{
            "key": "FLUID-2",
            "link": "https://tracker.example.com/browse/FLUID-2",
            "summary": "Finished",
            "creator": null,
            "assignee": null,
            "reporter": null,
            "parent": null,
            "issueType": "Task",
            "statusCategory": "Done",
            "resolution": "Fixed",
            "created": "2020-01-01T00:00:00.000+0000"
        }"#;

        let issue: SourceIssue = serde_json::from_str(json).unwrap();
        assert!(issue.is_terminal());
        assert_eq!(issue.resolution.as_deref(), Some("Fixed"));
    }
}
