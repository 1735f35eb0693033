//! Compilation error types.

use thiserror::Error;

/// Errors that can occur while compiling a source issue into a draft.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The source issue type has no target mapping and no fallback was
    /// configured.
    #[error("no target mapping for issue type '{issue_type}' on {key}")]
    UnmappedType { key: String, issue_type: String },
}
