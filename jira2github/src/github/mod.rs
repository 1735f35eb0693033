//! Target API client.
//!
//! Authenticates against GitHub with either a personal access token or
//! an app-credential triple, and exposes the three operations the
//! submission engine drives behind the [`IssueTransport`] seam.

mod error;
mod requests;

pub use error::{ConfigError, TransportError};
pub use requests::{CreateCommentRequest, CreateIssueRequest, CreatedIssue, UpdateIssueRequest};

use async_trait::async_trait;
use jsonwebtoken::EncodingKey;
use octocrab::models::{AppId, InstallationId};
use octocrab::Octocrab;
use tracing::debug;

/// Target-system credentials.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Personal access token.
    Token(String),

    /// GitHub App credentials.
    App {
        app_id: u64,
        /// RSA private key in PEM form.
        private_key: String,
        installation_id: u64,
    },
}

impl Credentials {
    /// Resolves credentials from the optional configuration fields.
    ///
    /// A token wins over app credentials when both are supplied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredentials`] when neither a token
    /// nor a complete app triple is present.
    pub fn resolve(
        token: Option<String>,
        app_id: Option<u64>,
        private_key: Option<String>,
        installation_id: Option<u64>,
    ) -> Result<Self, ConfigError> {
        if let Some(token) = token {
            return Ok(Credentials::Token(token));
        }

        match (app_id, private_key, installation_id) {
            (Some(app_id), Some(private_key), Some(installation_id)) => Ok(Credentials::App {
                app_id,
                private_key,
                installation_id,
            }),
            _ => Err(ConfigError::MissingCredentials),
        }
    }
}

/// The operations the submission engine performs against the target.
#[async_trait]
pub trait IssueTransport: Send + Sync {
    /// Creates an issue, returning its number and link.
    async fn create_issue(
        &self,
        request: &CreateIssueRequest,
    ) -> Result<CreatedIssue, TransportError>;

    /// Posts a comment on an existing issue.
    async fn create_comment(&self, request: &CreateCommentRequest) -> Result<(), TransportError>;

    /// Updates an issue's state.
    async fn update_issue(&self, request: &UpdateIssueRequest) -> Result<(), TransportError>;
}

/// GitHub-backed [`IssueTransport`].
pub struct GitHubClient {
    octocrab: Octocrab,
}

impl GitHubClient {
    /// Builds an authenticated client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the private key is unparseable or
    /// client initialization fails.
    pub fn new(credentials: &Credentials) -> Result<Self, ConfigError> {
        let octocrab = match credentials {
            Credentials::Token(token) => Octocrab::builder()
                .personal_token(token.clone())
                .build()?,
            Credentials::App {
                app_id,
                private_key,
                installation_id,
            } => {
                let key = EncodingKey::from_rsa_pem(private_key.as_bytes())?;
                Octocrab::builder()
                    .app(AppId(*app_id), key)
                    .build()?
                    .installation(InstallationId(*installation_id))?
            }
        };

        Ok(Self { octocrab })
    }
}

#[async_trait]
impl IssueTransport for GitHubClient {
    async fn create_issue(
        &self,
        request: &CreateIssueRequest,
    ) -> Result<CreatedIssue, TransportError> {
        debug!(owner = %request.owner, repo = %request.repo, title = %request.title, "Creating issue");
        let route = format!("/repos/{}/{}/issues", request.owner, request.repo);
        let created: CreatedIssue = self.octocrab.post(route, Some(request)).await?;
        Ok(created)
    }

    async fn create_comment(&self, request: &CreateCommentRequest) -> Result<(), TransportError> {
        let route = format!(
            "/repos/{}/{}/issues/{}/comments",
            request.owner, request.repo, request.issue_number
        );
        let _: serde_json::Value = self.octocrab.post(route, Some(request)).await?;
        Ok(())
    }

    async fn update_issue(&self, request: &UpdateIssueRequest) -> Result<(), TransportError> {
        let route = format!(
            "/repos/{}/{}/issues/{}",
            request.owner, request.repo, request.issue_number
        );
        let _: serde_json::Value = self.octocrab.patch(route, Some(request)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_wins_over_app_credentials() {
        let credentials = Credentials::resolve(
            Some("token".to_string()),
            Some(1),
            Some("key".to_string()),
            Some(2),
        )
        .unwrap();

        assert!(matches!(credentials, Credentials::Token(ref t) if t == "token"));
    }

    #[test]
    fn incomplete_app_triple_is_rejected() {
        let result = Credentials::resolve(None, Some(1), None, Some(2));
        assert!(matches!(result, Err(ConfigError::MissingCredentials)));
    }

    #[test]
    fn complete_app_triple_resolves() {
        let credentials =
            Credentials::resolve(None, Some(1), Some("pem".to_string()), Some(2)).unwrap();
        assert!(matches!(credentials, Credentials::App { app_id: 1, .. }));
    }
}
