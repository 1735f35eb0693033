//! Request and response shapes for the target API.

use serde::{Deserialize, Serialize};

/// Request to create an issue.
#[derive(Debug, Clone, Serialize)]
pub struct CreateIssueRequest {
    #[serde(skip_serializing)]
    pub owner: String,
    #[serde(skip_serializing)]
    pub repo: String,

    pub title: String,
    pub body: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    /// Target issue type name.
    #[serde(rename = "type")]
    pub issue_type: String,

    /// Milestone number, when resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<u64>,
}

/// Request to create a comment on an existing issue.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCommentRequest {
    #[serde(skip_serializing)]
    pub owner: String,
    #[serde(skip_serializing)]
    pub repo: String,
    #[serde(skip_serializing)]
    pub issue_number: u64,

    pub body: String,
}

/// Request to update an issue's state.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateIssueRequest {
    #[serde(skip_serializing)]
    pub owner: String,
    #[serde(skip_serializing)]
    pub repo: String,
    #[serde(skip_serializing)]
    pub issue_number: u64,

    pub state: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<String>,
}

/// The slice of the create-issue response the engine cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedIssue {
    pub number: u64,
    pub html_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_fields_stay_out_of_the_wire_payload() {
        let request = CreateIssueRequest {
            owner: "org".to_string(),
            repo: "repo".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            labels: vec!["bug".to_string()],
            issue_type: "Bug".to_string(),
            milestone: Some(5),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("owner").is_none());
        assert!(value.get("repo").is_none());
        assert_eq!(value["type"], "Bug");
        assert_eq!(value["milestone"], 5);
    }

    #[test]
    fn optional_fields_are_elided() {
        let request = CreateIssueRequest {
            owner: "org".to_string(),
            repo: "repo".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            labels: vec![],
            issue_type: "Task".to_string(),
            milestone: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("labels").is_none());
        assert!(value.get("milestone").is_none());
    }
}
