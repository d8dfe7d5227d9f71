//! Retrieval pipeline orchestrator.
//!
//! The [`RetrievalPipeline`] coordinates ingestion (extract → chunk → embed →
//! store) and retrieval (embed → nearest-neighbour search) by composing a
//! [`TextExtractor`], a [`Chunker`], an [`EmbeddingProvider`], and a
//! [`VectorStore`].
//!
//! Both directions degrade instead of failing: [`ingest_files`] reports
//! per-file errors in an [`IngestReport`] and keeps going, and [`search`]
//! logs failures and returns no results.
//!
//! [`ingest_files`]: RetrievalPipeline::ingest_files
//! [`search`]: RetrievalPipeline::search
//!
//! # Example
//!
//! ```rust,ignore
//! use docchat_rag::{RetrievalPipeline, RagConfig, InMemoryVectorStore, HashingEmbeddingProvider};
//!
//! let pipeline = RetrievalPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! pipeline.initialize().await?;
//! let report = pipeline.ingest_files(&["manual.pdf".into()]).await;
//! let results = pipeline.search("how do I reset it?", 5).await;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::chunking::{Chunker, ChunkingStrategy, FixedSizeChunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{
    CollectionStats, EmbeddedChunk, IngestReport, RetrievalResult, SourceDocument,
};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::extract::{FileTextExtractor, TextExtractor};
use crate::vectorstore::VectorStore;

/// Query-time retrieval, the seam the chat orchestrator depends on.
///
/// Implementations never fail: an empty result means "no context".
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `k` chunks most similar to `query`, best first.
    async fn search(&self, query: &str, k: usize) -> Vec<RetrievalResult>;
}

/// The retrieval pipeline.
///
/// Construct one via [`RetrievalPipeline::builder()`] and call
/// [`initialize`](Self::initialize) once before use.
pub struct RetrievalPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    extractor: Arc<dyn TextExtractor>,
}

impl RetrievalPipeline {
    /// Create a new [`RetrievalPipelineBuilder`].
    pub fn builder() -> RetrievalPipelineBuilder {
        RetrievalPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    fn collection(&self) -> &str {
        &self.config.collection
    }

    /// Create the configured collection if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the vector store operation fails.
    pub async fn initialize(&self) -> Result<()> {
        let dimensions = self.embedding_provider.dimensions();
        let name = self.collection();
        self.vector_store.create_collection(name, dimensions).await.map_err(|e| {
            error!(collection = name, error = %e, "failed to create collection");
            RagError::PipelineError(format!("failed to create collection '{name}': {e}"))
        })?;
        info!(
            collection = name,
            dimensions,
            backend = self.vector_store.backend(),
            embedding_model = self.embedding_provider.model_name(),
            "vector database initialized"
        );
        Ok(())
    }

    /// Ingest a batch of files.
    ///
    /// Each file is processed independently; a failure is recorded in the
    /// report and the batch continues. Never returns an error.
    pub async fn ingest_files(&self, paths: &[PathBuf]) -> IngestReport {
        let mut report = IngestReport::default();

        for path in paths {
            match self.ingest_path(path).await {
                Ok(chunk_count) => {
                    report.processed += 1;
                    report.total_chunks += chunk_count;
                    info!(path = %path.display(), chunk_count, "processed file");
                }
                Err(message) => {
                    warn!(path = %path.display(), error = %message, "file ingestion failed");
                    report.record_failure(message);
                }
            }
        }

        info!(
            processed = report.processed,
            failed = report.failed,
            total_chunks = report.total_chunks,
            "ingestion batch finished"
        );
        report
    }

    async fn ingest_path(&self, path: &Path) -> std::result::Result<usize, String> {
        let text = self
            .extract(path)
            .await
            .map_err(|e| format!("Error processing {}: {e}", path.display()))?;
        if text.is_empty() {
            return Err(format!("No text extracted from {}", path.display()));
        }

        let document = SourceDocument::from_path(path, text);
        self.ingest_document(&document).await.map_err(|e| match e {
            RagError::ChunkingError(_) => format!("No chunks created from {}", path.display()),
            other => format!("Error processing {}: {other}", path.display()),
        })
    }

    async fn extract(&self, path: &Path) -> Result<String> {
        let extractor = Arc::clone(&self.extractor);
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || extractor.extract(&owned))
            .await
            .map_err(|e| RagError::PipelineError(format!("extraction task failed: {e}")))?
    }

    /// Ingest text that has already been extracted, labelled with `source`.
    ///
    /// Returns the number of chunks stored.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkingError`] for blank text, or the embedding or
    /// storage error that stopped the write.
    pub async fn ingest_text(&self, source: &str, text: &str) -> Result<usize> {
        let document = SourceDocument {
            source: source.to_string(),
            path: PathBuf::from(source),
            text: text.trim().to_string(),
        };
        self.ingest_document(&document).await
    }

    /// Chunk → embed (one batch call) → store.
    async fn ingest_document(&self, document: &SourceDocument) -> Result<usize> {
        let chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            return Err(RagError::ChunkingError(format!(
                "no chunks created from '{}'",
                document.source
            )));
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(source = %document.source, error = %e, "embedding failed during ingestion");
            e
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::PipelineError(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let records: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding })
            .collect();

        self.vector_store.add(self.collection(), &records).await.map_err(|e| {
            error!(source = %document.source, error = %e, "store write failed during ingestion");
            e
        })?;

        debug!(source = %document.source, chunk_count = records.len(), "stored chunks");
        Ok(records.len())
    }

    /// Search, surfacing the failure cause instead of swallowing it.
    ///
    /// Similarity is `1 - distance` and rank follows the store's order.
    /// Results are not filtered by the configured similarity threshold.
    ///
    /// # Errors
    ///
    /// Returns the embedding or vector store error.
    pub async fn try_search(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        let query_embedding = self.embedding_provider.embed(query).await?;
        let matches = self.vector_store.query(self.collection(), &query_embedding, k).await?;

        let results: Vec<RetrievalResult> = matches
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(i, m)| RetrievalResult {
                chunk: m.chunk,
                similarity_score: 1.0 - m.distance,
                rank: i + 1,
            })
            .collect();

        debug!(k, result_count = results.len(), "search completed");
        Ok(results)
    }

    /// Search for the `k` chunks nearest to `query`.
    ///
    /// Any failure is logged and yields an empty vector; callers treat that
    /// as "no context".
    pub async fn search(&self, query: &str, k: usize) -> Vec<RetrievalResult> {
        self.try_search(query, k).await.unwrap_or_else(|e| {
            error!(error = %e, "error searching documents");
            Vec::new()
        })
    }

    /// Delete and recreate the collection. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if either store operation fails.
    pub async fn clear_all(&self) -> Result<()> {
        let name = self.collection();
        self.vector_store.delete_collection(name).await.map_err(|e| {
            error!(collection = name, error = %e, "failed to delete collection");
            RagError::PipelineError(format!("failed to delete collection '{name}': {e}"))
        })?;
        self.initialize().await?;
        info!(collection = name, "collection cleared");
        Ok(())
    }

    /// Report how many chunks are stored. Store errors are folded into the
    /// `error` field with a zero count.
    pub async fn collection_stats(&self) -> CollectionStats {
        let (total_chunks, error) = match self.vector_store.count(self.collection()).await {
            Ok(count) => (count, None),
            Err(e) => {
                error!(error = %e, "error getting collection stats");
                (0, Some(e.to_string()))
            }
        };
        CollectionStats {
            total_chunks,
            collection_name: self.config.collection.clone(),
            embedding_model: self.embedding_provider.model_name().to_string(),
            error,
        }
    }
}

#[async_trait]
impl Retriever for RetrievalPipeline {
    async fn search(&self, query: &str, k: usize) -> Vec<RetrievalResult> {
        RetrievalPipeline::search(self, query, k).await
    }
}

/// Builder for constructing a [`RetrievalPipeline`].
///
/// `embedding_provider` and `vector_store` are required. The chunker defaults
/// to the one selected by [`RagConfig::chunking`] and the extractor to
/// [`FileTextExtractor`].
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RetrievalPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RetrievalPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    extractor: Option<Arc<dyn TextExtractor>>,
}

impl RetrievalPipelineBuilder {
    /// Set the pipeline configuration. Defaults to [`RagConfig::default`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Override the chunker chosen from the configuration.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the text extractor.
    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Build the [`RetrievalPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or the
    /// configuration is inconsistent.
    pub fn build(self) -> Result<RetrievalPipeline> {
        let config = self.config.unwrap_or_default();
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;

        let chunker = self.chunker.unwrap_or_else(|| match config.chunking {
            ChunkingStrategy::Fixed => {
                Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap))
            }
            ChunkingStrategy::Recursive => {
                Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap))
            }
        });
        let extractor = self.extractor.unwrap_or_else(|| Arc::new(FileTextExtractor));

        Ok(RetrievalPipeline { config, embedding_provider, vector_store, chunker, extractor })
    }
}
