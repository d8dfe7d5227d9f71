//! # docchat-rag
//!
//! Document ingestion and retrieval for docchat.
//!
//! ## Overview
//!
//! Files go in one side and similar chunks come out the other:
//!
//! - [`FileTextExtractor`] - plain text from PDF, DOCX, and TXT files
//! - [`FixedSizeChunker`] / [`RecursiveChunker`] - overlapping chunks
//! - [`OllamaEmbeddingProvider`] / [`HashingEmbeddingProvider`] - vectors
//! - [`InMemoryVectorStore`] (optionally persisted) and `QdrantVectorStore`
//!   behind the `qdrant` feature - cosine nearest-neighbour search
//! - [`RetrievalPipeline`] - ties the above together
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docchat_rag::{HashingEmbeddingProvider, InMemoryVectorStore, RagConfig, RetrievalPipeline};
//!
//! let pipeline = RetrievalPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//! pipeline.initialize().await?;
//!
//! let report = pipeline.ingest_files(&["handbook.pdf".into()]).await;
//! println!("{} chunks from {} files", report.total_chunks, report.processed);
//!
//! for hit in pipeline.search("vacation policy", 5).await {
//!     println!("#{} {:.2} {}", hit.rank, hit.similarity_score, hit.chunk.source_file);
//! }
//! ```
//!
//! ## Features
//!
//! - `qdrant` - enables the Qdrant gRPC backend

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod inmemory;
pub mod ollama;
pub mod pipeline;
#[cfg(feature = "qdrant")]
pub mod qdrant;
pub mod vectorstore;

pub use chunking::{Chunker, ChunkingStrategy, FixedSizeChunker, RecursiveChunker};
pub use config::{DEFAULT_COLLECTION, RagConfig, RagConfigBuilder};
pub use document::{
    CollectionStats, DocumentChunk, EmbeddedChunk, IngestReport, RetrievalResult, SourceDocument,
    StoreMatch,
};
pub use embedding::{EmbeddingProvider, HashingEmbeddingProvider};
pub use error::{RagError, Result};
pub use extract::{DocumentFormat, FileTextExtractor, SUPPORTED_EXTENSIONS, TextExtractor};
pub use inmemory::InMemoryVectorStore;
pub use ollama::OllamaEmbeddingProvider;
pub use pipeline::{RetrievalPipeline, RetrievalPipelineBuilder, Retriever};
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
pub use vectorstore::VectorStore;
