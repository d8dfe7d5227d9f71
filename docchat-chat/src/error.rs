//! Error types for the `docchat-chat` crate.

use thiserror::Error;

/// Errors returned by [`ChatOrchestrator::respond`](crate::ChatOrchestrator::respond).
///
/// Model failures are not errors: they come back as a response with
/// `success == false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// The query was empty or whitespace only.
    #[error("Message must not be empty")]
    EmptyQuery,

    /// A collaborator needed for the requested mode is not configured.
    #[error("{0} not available")]
    ServiceUnavailable(String),
}

/// Convenience type alias for results in this crate.
pub type Result<T> = std::result::Result<T, ChatError>;
