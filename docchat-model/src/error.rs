//! Error types for the `docchat-model` crate.

use thiserror::Error;

/// Reply shown to the user when the model server answers with a non-2xx status.
pub const HTTP_APOLOGY: &str = "Sorry, I encountered an error while generating a response.";

/// Reply shown to the user when generation exceeds its deadline.
pub const TIMEOUT_APOLOGY: &str = "Sorry, the request took too long to process. Please try again.";

/// Reply shown to the user for every other failure.
pub const UNEXPECTED_APOLOGY: &str = "Sorry, I encountered an unexpected error. Please try again.";

/// Errors returned by a [`LanguageModel`](crate::LanguageModel).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The request did not complete within its deadline.
    #[error("Request timed out")]
    Timeout,

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body as text.
        body: String,
    },

    /// The server could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server answered 2xx with a body that could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The client was configured with unusable settings.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ModelError {
    /// The user-facing apology for this failure kind.
    pub fn apology(&self) -> &'static str {
        match self {
            Self::Timeout => TIMEOUT_APOLOGY,
            Self::Http { .. } => HTTP_APOLOGY,
            _ => UNEXPECTED_APOLOGY,
        }
    }
}

impl From<reqwest::Error> for ModelError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Connection(e.to_string())
        }
    }
}

/// Convenience type alias for results in this crate.
pub type Result<T> = std::result::Result<T, ModelError>;
