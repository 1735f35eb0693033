//! Paginated source retrieval.
//!
//! Fetches issues from the source tracker's search API and normalizes
//! each wire record into a [`SourceIssue`] through declarative serde
//! mapping. Every page fetch goes through the shared scheduler; the
//! continuation token from one page gates the request for the next.

mod convert;
mod error;

pub use convert::{MarkdownPassthrough, RichTextConverter};
pub use error::FetchError;

use crate::schedule::Scheduler;
use crate::source::{
    SourceAttachment, SourceComment, SourceIssue, SourceIssueRef, SourceLink, SourceUser,
    SourceVersion,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

/// Upper bound on pages fetched in one run; a search that claims more
/// continuation than this is treated as a protocol anomaly.
const MAX_PAGES: usize = 1000;

/// A search request against the source tracker.
#[derive(Debug, Clone)]
pub struct JiraQuery {
    /// Search endpoint, e.g. `https://tracker.example.com/rest/api/3/search/jql`.
    pub url: String,

    /// JQL selecting the issues to migrate.
    pub jql: String,

    /// Fields requested per issue.
    pub fields: String,
}

impl JiraQuery {
    /// Creates a query requesting every field.
    pub fn new(url: impl Into<String>, jql: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            jql: jql.into(),
            fields: "*all".to_string(),
        }
    }
}

/// Fetches all pages of a search, returning normalized issues.
///
/// # Errors
///
/// Returns [`FetchError`] on a non-success response, a repeated
/// continuation token, or an implausible page count. Retrieval is
/// all-or-nothing; no partial export is returned.
pub async fn fetch_issues(
    client: &reqwest::Client,
    query: &JiraQuery,
    scheduler: &Scheduler,
    converter: &dyn RichTextConverter,
) -> Result<Vec<SourceIssue>, FetchError> {
    let mut issues = Vec::new();
    let mut page_token: Option<String> = None;
    let mut seen_tokens = std::collections::HashSet::new();

    for page in 0.. {
        if page >= MAX_PAGES {
            return Err(FetchError::PageLimitExceeded { limit: MAX_PAGES });
        }

        let mut params = vec![
            ("jql", query.jql.clone()),
            ("fields", query.fields.clone()),
        ];
        if let Some(token) = &page_token {
            params.push(("nextPageToken", token.clone()));
        }

        info!(page, url = %query.url, "Loading search page");
        let response: SearchPage = scheduler
            .run(|| async {
                client
                    .get(&query.url)
                    .query(&params)
                    .header("X-Force-Accept-Language", "true")
                    .header("Accept-Language", "en")
                    .send()
                    .await?
                    .error_for_status()?
                    .json::<SearchPage>()
                    .await
            })
            .await?;

        issues.extend(response.issues.into_iter().map(|raw| normalize(raw, converter)));

        match response.next_page_token {
            None => break,
            Some(token) => {
                if !seen_tokens.insert(token.clone()) {
                    return Err(FetchError::TokenRepeated { page });
                }
                page_token = Some(token);
            }
        }
    }

    info!(count = issues.len(), "Retrieval complete");
    Ok(issues)
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    issues: Vec<RawIssue>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    key: String,
    #[serde(rename = "self")]
    self_link: String,
    fields: RawFields,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ProjectRef {
    key: String,
}

#[derive(Debug, Deserialize)]
struct RawFields {
    summary: String,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    environment: Option<Value>,
    #[serde(default)]
    components: Vec<Named>,
    #[serde(default)]
    creator: Option<SourceUser>,
    #[serde(default)]
    assignee: Option<SourceUser>,
    #[serde(default)]
    reporter: Option<SourceUser>,
    #[serde(default)]
    comment: Option<RawComments>,
    #[serde(default)]
    attachment: Vec<SourceAttachment>,
    issuetype: Named,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    issuelinks: Vec<RawIssueLink>,
    #[serde(default)]
    subtasks: Vec<RawIssueRef>,
    #[serde(default)]
    parent: Option<RawIssueRef>,
    #[serde(default)]
    versions: Vec<SourceVersion>,
    #[serde(rename = "fixVersions", default)]
    fix_versions: Vec<SourceVersion>,
    #[serde(rename = "statusCategory", default)]
    status_category: Option<Named>,
    #[serde(default)]
    resolution: Option<Named>,
    created: String,
    project: ProjectRef,
}

#[derive(Debug, Deserialize)]
struct RawComments {
    #[serde(default)]
    comments: Vec<RawComment>,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: String,
    #[serde(default)]
    author: Option<SourceUser>,
    #[serde(rename = "updateAuthor", default)]
    update_author: Option<SourceUser>,
    created: String,
    #[serde(default)]
    body: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawIssueLink {
    #[serde(rename = "type")]
    link_type: RawLinkType,
    #[serde(rename = "inwardIssue")]
    inward_issue: Option<RawIssueRef>,
    #[serde(rename = "outwardIssue")]
    outward_issue: Option<RawIssueRef>,
}

#[derive(Debug, Deserialize)]
struct RawLinkType {
    inward: String,
    outward: String,
}

#[derive(Debug, Deserialize)]
struct RawIssueRef {
    key: String,
    #[serde(default)]
    fields: Option<RefFields>,
}

#[derive(Debug, Deserialize, Default)]
struct RefFields {
    #[serde(default)]
    summary: String,
}

/// Derives the human-facing browse link from an issue's API self link.
fn browse_link(self_link: &str, key: &str) -> String {
    match Url::parse(self_link) {
        Ok(mut url) => {
            url.set_path(&format!("browse/{key}"));
            url.set_query(None);
            url.to_string()
        }
        Err(_) => {
            warn!(self_link, "Unparseable self link, keeping as-is");
            self_link.to_string()
        }
    }
}

fn normalize_ref(reference: RawIssueRef) -> SourceIssueRef {
    SourceIssueRef {
        summary: reference.fields.unwrap_or_default().summary,
        key: reference.key,
    }
}

fn normalize(raw: RawIssue, converter: &dyn RichTextConverter) -> SourceIssue {
    let fields = raw.fields;

    let mut issue_links = Vec::new();
    for link in fields.issuelinks {
        if let Some(inward) = link.inward_issue {
            let normalized = normalize_ref(inward);
            issue_links.push(SourceLink {
                relation: link.link_type.inward.clone(),
                key: normalized.key,
                summary: normalized.summary,
            });
        }
        if let Some(outward) = link.outward_issue {
            let normalized = normalize_ref(outward);
            issue_links.push(SourceLink {
                relation: link.link_type.outward.clone(),
                key: normalized.key,
                summary: normalized.summary,
            });
        }
    }

    let comments = fields
        .comment
        .map(|wrapper| wrapper.comments)
        .unwrap_or_default()
        .into_iter()
        .map(|comment| SourceComment {
            id: comment.id,
            author: comment.author,
            update_author: comment.update_author,
            created: comment.created,
            body: comment
                .body
                .map(|body| converter.to_markdown(&body))
                .unwrap_or_default(),
        })
        .collect();

    SourceIssue {
        link: browse_link(&raw.self_link, &raw.key),
        key: raw.key,
        project_key: fields.project.key,
        summary: fields.summary,
        description: fields
            .description
            .map(|value| converter.to_markdown(&value))
            .unwrap_or_default(),
        environment: fields
            .environment
            .map(|value| converter.to_markdown(&value))
            .filter(|text| !text.is_empty()),
        components: fields
            .components
            .into_iter()
            .map(|component| component.name)
            .collect(),
        creator: fields.creator,
        assignee: fields.assignee,
        reporter: fields.reporter,
        comments,
        attachments: fields.attachment,
        issue_type: fields.issuetype.name,
        labels: fields.labels,
        issue_links,
        subtasks: fields.subtasks.into_iter().map(normalize_ref).collect(),
        parent: fields.parent.map(normalize_ref),
        versions: fields.versions,
        fix_versions: fields.fix_versions,
        status_category: fields
            .status_category
            .map(|category| category.name)
            .unwrap_or_default(),
        resolution: fields.resolution.map(|resolution| resolution.name),
        created: fields.created,
    }
}
