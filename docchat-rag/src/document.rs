//! Data types for documents, chunks, and search results.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Text extracted from one source file, ready for chunking.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    /// Display name of the source, normally the file name.
    pub source: String,
    /// Path the text was read from.
    pub path: PathBuf,
    /// The extracted text.
    pub text: String,
}

impl SourceDocument {
    /// Create a document from a path and its extracted text. The source label
    /// is the final path component.
    pub fn from_path(path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        let path = path.as_ref().to_path_buf();
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { source, path, text: text.into() }
    }
}

/// A contiguous slice of a source document's text.
///
/// Chunks are immutable once stored and are removed only by clearing the
/// whole collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    /// Unique identifier, freshly generated on every ingestion.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// Source label (file name) used for provenance.
    pub source_file: String,
    /// Full path the source was read from.
    pub file_path: String,
    /// Zero-based position of this chunk within its source.
    pub chunk_index: usize,
    /// Number of chunks the source produced.
    pub chunk_count: usize,
    /// When the chunk was created.
    pub created_at: DateTime<Utc>,
}

/// A [`DocumentChunk`] paired with its embedding. Stores write both together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedChunk {
    /// The chunk.
    pub chunk: DocumentChunk,
    /// The chunk's embedding vector.
    pub embedding: Vec<f32>,
}

/// A raw nearest-neighbour match as reported by a [`VectorStore`](crate::VectorStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMatch {
    /// The matched chunk.
    pub chunk: DocumentChunk,
    /// Cosine distance in `[0, 2]`; lower is closer.
    pub distance: f32,
}

/// A retrieved chunk with its similarity and rank for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// The retrieved chunk.
    pub chunk: DocumentChunk,
    /// `1 - cosine distance`, so in `[-1, 1]`; higher is more relevant.
    pub similarity_score: f32,
    /// 1-based position in the store's result order.
    pub rank: usize,
}

/// Aggregate outcome of ingesting a batch of files.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestReport {
    /// Files fully stored.
    pub processed: usize,
    /// Files that failed at any stage.
    pub failed: usize,
    /// Chunks written across all processed files.
    pub total_chunks: usize,
    /// One human-readable line per failure.
    pub errors: Vec<String>,
}

impl IngestReport {
    pub(crate) fn record_failure(&mut self, message: String) {
        self.failed += 1;
        self.errors.push(message);
    }
}

/// Summary of the document collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionStats {
    /// Chunks currently stored.
    pub total_chunks: usize,
    /// Name of the backing collection.
    pub collection_name: String,
    /// Embedding model that produced the stored vectors.
    pub embedding_model: String,
    /// Present when the store could not be queried.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
