//! Identity resolution.
//!
//! Builds the user map artifact: one entry per distinct source account id,
//! mapping it to a display name, profile link and an (operator-filled)
//! GitHub handle. Pure; no network access.

use crate::source::{SourceIssue, SourceUser};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Resolved identity table, keyed by source account id.
pub type UserMap = BTreeMap<String, UserMapEntry>;

/// A single user map entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMapEntry {
    /// Display name from the source tracker.
    pub name: String,

    /// Profile link from the source tracker.
    pub link: String,

    /// GitHub handle, empty until an operator fills it in.
    #[serde(default)]
    pub github: String,
}

/// Role strength of the sighting that produced an entry.
///
/// Assignee, creator and reporter are strong roles; comment authorship is
/// weak. A strong sighting always replaces a weak entry for the same id,
/// and the first strong sighting wins among strong roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Strong,
    Weak,
}

/// Resolves the identity map from the full set of source issues.
///
/// Deterministic and idempotent given identical input order: every
/// distinct account id appears exactly once in the result, with the
/// name and link taken from its first strong sighting when one exists.
pub fn generate_user_map(issues: &[SourceIssue]) -> UserMap {
    let mut map = UserMap::new();
    let mut roles: HashMap<String, Role> = HashMap::new();

    for issue in issues {
        register(&mut map, &mut roles, issue.creator.as_ref(), Role::Strong);
        register(&mut map, &mut roles, issue.assignee.as_ref(), Role::Strong);
        register(&mut map, &mut roles, issue.reporter.as_ref(), Role::Strong);

        for comment in &issue.comments {
            register(&mut map, &mut roles, comment.author.as_ref(), Role::Weak);
            register(
                &mut map,
                &mut roles,
                comment.update_author.as_ref(),
                Role::Weak,
            );
        }
    }

    map
}

fn register(
    map: &mut UserMap,
    roles: &mut HashMap<String, Role>,
    user: Option<&SourceUser>,
    role: Role,
) {
    let Some(user) = user else {
        return;
    };

    match roles.get(&user.account_id) {
        // First strong sighting wins; weak never replaces anything.
        Some(Role::Strong) => return,
        Some(Role::Weak) if role == Role::Weak => return,
        _ => {}
    }

    roles.insert(user.account_id.clone(), role);
    map.insert(
        user.account_id.clone(),
        UserMapEntry {
            name: user.display_name.clone(),
            link: user.self_link.clone(),
            github: String::new(),
        },
    );
}

/// Renders an account id as a mention using the resolved identity map.
///
/// A mapped identity with a GitHub handle renders as `@handle`; one
/// without renders as the bare display name. Unknown ids render empty.
pub fn resolve_mention(account_id: &str, user_map: &UserMap) -> String {
    match user_map.get(account_id) {
        Some(entry) if !entry.github.is_empty() => format!("@{}", entry.github),
        Some(entry) => entry.name.clone(),
        None => String::new(),
    }
}
