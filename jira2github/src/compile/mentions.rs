//! Mention substitution.
//!
//! Source comment bodies reference people by `@` followed by their
//! display name. Substitution scans known identities longest-name-first
//! so a short name never matches inside a longer one ("Ann" vs "Anna"),
//! and runs as a single regex pass so replacement output is never
//! rescanned.

use crate::identity::UserMap;
use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

/// Compiled substituter for one resolved identity map.
pub struct MentionSubstituter {
    pattern: Option<Regex>,
    replacements: HashMap<String, String>,
}

impl MentionSubstituter {
    /// Builds a substituter from the resolved identity map.
    pub fn new(user_map: &UserMap) -> Self {
        let mut replacements: HashMap<String, String> = HashMap::new();
        for entry in user_map.values() {
            if entry.name.is_empty() {
                continue;
            }
            let rendered = if entry.github.is_empty() {
                entry.name.clone()
            } else {
                format!("@{}", entry.github)
            };
            replacements.entry(entry.name.clone()).or_insert(rendered);
        }

        // Longest display name first; ties broken lexically.
        let mut names: Vec<&String> = replacements.keys().collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let pattern = if names.is_empty() {
            None
        } else {
            let alternation = names
                .iter()
                .map(|name| regex::escape(name))
                .collect::<Vec<_>>()
                .join("|");
            match Regex::new(&format!("@({alternation})")) {
                Ok(regex) => Some(regex),
                Err(error) => {
                    warn!(%error, "Failed to build mention pattern, leaving tokens as-is");
                    None
                }
            }
        };

        Self {
            pattern,
            replacements,
        }
    }

    /// Replaces every known mention token in `text`.
    ///
    /// A known identity with a GitHub handle renders as `@handle`; one
    /// without renders as the bare display name. Text without tokens
    /// passes through unchanged.
    pub fn substitute(&self, text: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return text.to_string();
        };

        pattern
            .replace_all(text, |caps: &regex::Captures| {
                let name = &caps[1];
                self.replacements
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}
