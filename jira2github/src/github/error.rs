//! Transport and configuration error types.

use thiserror::Error;

/// Errors building the target API client.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither a personal token nor a complete app-credential triple was
    /// supplied.
    #[error("a personal access token or complete app credentials (app id, private key, installation id) are required")]
    MissingCredentials,

    /// The app private key could not be parsed.
    #[error("invalid app private key: {0}")]
    InvalidPrivateKey(#[from] jsonwebtoken::errors::Error),

    /// Client initialization failed.
    #[error(transparent)]
    Octocrab(#[from] octocrab::Error),
}

/// A non-success response from either API.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Target API error.
    #[error("GitHub API error: {0}")]
    GitHub(#[from] octocrab::Error),

    /// Source API or download error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TransportError {
    /// HTTP status of the failed request, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::GitHub(octocrab::Error::GitHub { source, .. }) => {
                Some(source.status_code.as_u16())
            }
            TransportError::GitHub(_) => None,
            TransportError::Http(error) => error.status().map(|status| status.as_u16()),
        }
    }

    /// Whether the failure is worth retrying.
    ///
    /// Rate limiting (429) and server errors (5xx) are transient; other
    /// status codes are permanent. Failures without a status (connection
    /// resets, timeouts) count as transient.
    pub fn is_transient(&self) -> bool {
        match self.status() {
            Some(status) => status == 429 || (500..600).contains(&status),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statusless_failures_are_transient() {
        // A request that never reaches the wire yields no status.
        let error = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();

        let transport = TransportError::Http(error);
        assert_eq!(transport.status(), None);
        assert!(transport.is_transient());
    }
}
