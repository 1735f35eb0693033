//! Issue body assembly.
//!
//! Builds the target issue body by concatenating sections in a fixed
//! order: description, components, details, the mandatory provenance
//! section, then attachments, subtasks, parent and linked issues.

use super::CompileOptions;
use crate::identity::{resolve_mention, UserMap};
use crate::source::SourceIssue;
use chrono::DateTime;
use std::fmt::Write;

/// Formats a source timestamp as a long localized date, e.g. "July 5, 2019".
///
/// Falls back to the raw value when the timestamp cannot be parsed.
pub(crate) fn format_long_date(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.3f%z"))
        .map(|date| date.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Builds a link to a related issue by substituting the related key for
/// the issue's own key inside its own URL.
pub(crate) fn related_link(source_link: &str, own_key: &str, related_key: &str) -> String {
    source_link.replacen(own_key, related_key, 1)
}

/// Assembles the full body for a source issue.
pub(crate) fn compile_body(
    issue: &SourceIssue,
    user_map: &UserMap,
    options: &CompileOptions,
    source_link: &str,
) -> String {
    let mut body = issue.description.clone();

    if !issue.components.is_empty() {
        let _ = write!(body, "\n\n## Components\n\n- {}", issue.components.join("\n- "));
    }

    if let Some(environment) = issue.environment.as_deref().filter(|e| !e.is_empty()) {
        let _ = write!(body, "\n\n## Details\n\n{environment}");
    }

    let author = issue
        .reporter
        .as_ref()
        .map(|reporter| resolve_mention(&reporter.account_id, user_map))
        .unwrap_or_default();
    let _ = write!(
        body,
        "\n\n## Additional context or notes\n\nOriginally filed as [{key}]({source_link}) by {author} on {date}.",
        key = issue.key,
        date = format_long_date(&issue.created),
    );

    if !issue.attachments.is_empty() {
        let entries: Vec<String> = issue
            .attachments
            .iter()
            .map(|attachment| match &options.attachment_base_url {
                Some(base) => format!(
                    "[{name}]({base}/{project}/{key}/{name})",
                    name = attachment.filename,
                    base = base.trim_end_matches('/'),
                    project = issue.project_key,
                    key = issue.key,
                ),
                None => attachment.filename.clone(),
            })
            .collect();
        let _ = write!(body, "\n\n### Attachments\n\n- {}", entries.join("\n- "));
    }

    if !issue.subtasks.is_empty() {
        let entries: Vec<String> = issue
            .subtasks
            .iter()
            .map(|subtask| {
                format!(
                    "[{key}]({link})",
                    key = subtask.key,
                    link = related_link(source_link, &issue.key, &subtask.key),
                )
            })
            .collect();
        let _ = write!(body, "\n\n### Subtasks\n\n- {}", entries.join("\n- "));
    }

    if let Some(parent) = &issue.parent {
        let _ = write!(
            body,
            "\n\n### Parent\n\n[{key}]({link})",
            key = parent.key,
            link = related_link(source_link, &issue.key, &parent.key),
        );
    }

    if !issue.issue_links.is_empty() {
        body.push_str("\n\n### Linked issues\n");

        // Group by relation description, preserving first-seen order.
        let mut relations: Vec<(&str, Vec<&str>)> = Vec::new();
        for link in &issue.issue_links {
            match relations.iter_mut().find(|(r, _)| *r == link.relation) {
                Some((_, keys)) => keys.push(&link.key),
                None => relations.push((&link.relation, vec![&link.key])),
            }
        }

        for (relation, keys) in relations {
            let entries: Vec<String> = keys
                .iter()
                .map(|key| format!("[{key}]({})", related_link(source_link, &issue.key, key)))
                .collect();
            let _ = write!(body, "\n- {relation}\n  - {}", entries.join("\n  - "));
        }
    }

    body
}
