//! Error types for the `docchat-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in ingestion and retrieval.
#[derive(Debug, Error)]
pub enum RagError {
    /// A file could not be read or its text could not be extracted.
    #[error("Extraction error ({path}): {message}")]
    ExtractionError {
        /// The file being extracted.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// The file extension has no registered extractor.
    #[error("Unsupported format: {extension} ({path})")]
    UnsupportedFormat {
        /// The offending file.
        path: PathBuf,
        /// The extension as found on the path (empty when there is none).
        extension: String,
    },

    /// Extracted text produced no chunks.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RagError {
    pub(crate) fn store(backend: &str, message: impl Into<String>) -> Self {
        Self::VectorStoreError { backend: backend.to_string(), message: message.into() }
    }

    pub(crate) fn embedding(provider: &str, message: impl Into<String>) -> Self {
        Self::EmbeddingError { provider: provider.to_string(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
