//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{EmbeddedChunk, StoreMatch};
use crate::error::Result;

/// A storage backend for chunk embeddings with cosine nearest-neighbour search.
///
/// Implementations manage named collections. Each record pairs a chunk with
/// its embedding and is written as a unit, so a stored chunk always has a
/// vector of the collection's dimensionality.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::{VectorStore, InMemoryVectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 384).await?;
/// store.add("docs", &records).await?;
/// let matches = store.query("docs", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name used in logs and errors.
    fn backend(&self) -> &str;

    /// Create a named collection. No-op if it already exists with the same
    /// dimensionality. Backends that can tell should reject an existing
    /// collection holding vectors of another width.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data. No-op if it does not exist.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Add records to a collection. On error nothing from `records` is stored.
    async fn add(&self, collection: &str, records: &[EmbeddedChunk]) -> Result<()>;

    /// Return up to `top_k` records nearest to `embedding`, closest first,
    /// with their cosine distance.
    async fn query(&self, collection: &str, embedding: &[f32], top_k: usize)
    -> Result<Vec<StoreMatch>>;

    /// Number of records in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;
}
