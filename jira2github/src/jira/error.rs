//! Source retrieval error types.

use thiserror::Error;

/// Errors that can occur during paginated source retrieval.
///
/// All of these abort retrieval; nothing downstream runs on a partial
/// export.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request or decode failure against the source API.
    #[error("source API error: {0}")]
    Http(#[from] reqwest::Error),

    /// The continuation token from one page reappeared on a later page.
    #[error("pagination token repeated after page {page}")]
    TokenRepeated { page: usize },

    /// More pages than the protocol plausibly produces.
    #[error("page limit of {limit} pages exceeded")]
    PageLimitExceeded { limit: usize },
}
