//! Version resolution.
//!
//! Builds the milestone map artifact: each distinct version label across
//! the export's `versions` and `fixVersions` fields becomes a key whose
//! value an operator fills in with a GitHub milestone id between runs.

use crate::source::SourceIssue;
use semver::{Prerelease, Version};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Loaded milestone map artifact: normalized version label to milestone id.
pub type MilestoneMap = BTreeMap<String, String>;

/// A single milestone map entry, ordered for artifact emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneMapEntry {
    /// Possibly-normalized version label.
    pub version: String,

    /// GitHub milestone id, empty until an operator fills it in.
    pub milestone: String,
}

/// Resolves the milestone map from the full set of source issues.
///
/// With `semantic` enabled, labels are coerced to valid semantic versions
/// (see [`normalize_version`]) and the entries come back in ascending
/// semantic order; labels that cannot be coerced are dropped with a
/// warning. Without it, raw labels are kept in lexical order. Duplicate
/// keys collapse either way.
pub fn generate_milestone_map(issues: &[SourceIssue], semantic: bool) -> Vec<MilestoneMapEntry> {
    let labels = issues
        .iter()
        .flat_map(|issue| issue.versions.iter().chain(issue.fix_versions.iter()))
        .map(|version| version.name.as_str());

    let keys = if semantic {
        let mut versions: Vec<Version> = labels
            .filter_map(|label| {
                let version = coerce_version(label);
                if version.is_none() {
                    warn!(label, "Version label is not coercible, dropping");
                }
                version
            })
            .collect();
        versions.sort();
        versions.dedup();
        versions.into_iter().map(|v| v.to_string()).collect()
    } else {
        let mut raw: Vec<String> = labels.map(str::to_string).collect();
        raw.sort();
        raw.dedup();
        raw
    };

    keys.into_iter()
        .map(|version| MilestoneMapEntry {
            version,
            milestone: String::new(),
        })
        .collect()
}

/// Normalizes a version label to its semantic milestone key.
///
/// Returns `None` when the label cannot be coerced to a valid version.
pub fn normalize_version(label: &str) -> Option<String> {
    coerce_version(label).map(|v| v.to_string())
}

/// Coerces a loose version label into a valid semantic version.
///
/// A "beta" marker inside the label is rewritten into a prerelease
/// segment before coercion, so "2.0beta" comes out as `2.0.0-beta.0`.
/// Already-valid versions pass through unchanged.
pub(crate) fn coerce_version(label: &str) -> Option<Version> {
    if let Ok(version) = Version::parse(label) {
        return Some(version);
    }

    let rewritten = label.replacen("beta", "-beta.", 1);
    let (core, prerelease) = match rewritten.split_once('-') {
        Some((core, rest)) => (core, Some(rest)),
        None => (rewritten.as_str(), None),
    };

    let mut numbers = core.split('.').map(|part| part.trim().parse::<u64>());
    let major = numbers.next()?.ok()?;
    let minor = numbers.next().unwrap_or(Ok(0)).ok()?;
    let patch = numbers.next().unwrap_or(Ok(0)).ok()?;

    let pre = match prerelease {
        Some(rest) => {
            let mut segments: Vec<&str> = rest.split('.').filter(|s| !s.is_empty()).collect();
            // A dangling separator marks an elided zero, as in "2.0beta".
            if rest.ends_with('.') {
                segments.push("0");
            }
            Prerelease::new(&segments.join(".")).ok()?
        }
        None => Prerelease::EMPTY,
    };

    Some(Version {
        major,
        minor,
        patch,
        pre,
        build: semver::BuildMetadata::EMPTY,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceVersion;

    fn issue_with_versions(versions: &[&str], fix_versions: &[&str]) -> SourceIssue {
        SourceIssue {
            key: "T-1".to_string(),
            link: "https://tracker.example.com/browse/T-1".to_string(),
            project_key: "T".to_string(),
            summary: "s".to_string(),
            description: String::new(),
            environment: None,
            components: vec![],
            creator: None,
            assignee: None,
            reporter: None,
            comments: vec![],
            attachments: vec![],
            issue_type: "Bug".to_string(),
            labels: vec![],
            issue_links: vec![],
            subtasks: vec![],
            parent: None,
            versions: versions
                .iter()
                .map(|name| SourceVersion {
                    name: name.to_string(),
                })
                .collect(),
            fix_versions: fix_versions
                .iter()
                .map(|name| SourceVersion {
                    name: name.to_string(),
                })
                .collect(),
            status_category: String::new(),
            resolution: None,
            created: "2020-01-01T00:00:00.000+0000".to_string(),
        }
    }

    #[test]
    fn beta_label_becomes_prerelease() {
        assert_eq!(normalize_version("2.0beta").as_deref(), Some("2.0.0-beta.0"));
        assert_eq!(
            normalize_version("2.0.0-beta.0").as_deref(),
            Some("2.0.0-beta.0")
        );
        assert_eq!(normalize_version("1.1").as_deref(), Some("1.1.0"));
        assert_eq!(normalize_version("1.4.2").as_deref(), Some("1.4.2"));
        assert_eq!(normalize_version("unversioned"), None);
    }

    #[test]
    fn keys_are_unique_and_ascending() {
        let issues = vec![
            issue_with_versions(&["2.0beta", "1.1"], &["2.0beta"]),
            issue_with_versions(&["1.4.2"], &["2.0.0-beta.0", "1.1"]),
        ];

        let entries = generate_milestone_map(&issues, true);
        let keys: Vec<&str> = entries.iter().map(|e| e.version.as_str()).collect();

        assert_eq!(keys, vec!["1.1.0", "1.4.2", "2.0.0-beta.0"]);
        assert!(entries.iter().all(|e| e.milestone.is_empty()));

        // Ascending semantic order never decreases.
        let versions: Vec<Version> = keys
            .iter()
            .map(|k| Version::parse(k).unwrap())
            .collect();
        assert!(versions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn prerelease_orders_before_release() {
        let issues = vec![issue_with_versions(&["2.0", "2.0beta"], &[])];

        let entries = generate_milestone_map(&issues, true);
        let keys: Vec<&str> = entries.iter().map(|e| e.version.as_str()).collect();
        assert_eq!(keys, vec!["2.0.0-beta.0", "2.0.0"]);
    }

    #[test]
    fn raw_mode_keeps_labels_lexically() {
        let issues = vec![issue_with_versions(&["2.0beta", "1.10", "1.2"], &["1.2"])];

        let entries = generate_milestone_map(&issues, false);
        let keys: Vec<&str> = entries.iter().map(|e| e.version.as_str()).collect();
        assert_eq!(keys, vec!["1.10", "1.2", "2.0beta"]);
    }
}
