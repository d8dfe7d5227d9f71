//! In-memory vector store using cosine distance.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It can optionally mirror
//! its contents to a JSON snapshot file so the collection survives restarts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::{EmbeddedChunk, StoreMatch};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Collection {
    dimensions: usize,
    /// Insertion order is kept so equal distances rank deterministically.
    records: Vec<EmbeddedChunk>,
}

/// An in-memory vector store using cosine distance for search.
///
/// Collections map a name to its records. All operations are async-safe via
/// `tokio::sync::RwLock`. When built with [`persistent`](Self::persistent),
/// every mutation rewrites the snapshot file before returning.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::persistent("./docchat_store.json")?;
/// store.create_collection("docs", 384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
    snapshot: Option<PathBuf>,
}

impl InMemoryVectorStore {
    /// Create a new empty, non-persistent store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store mirrored to `path`, loading any existing snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStoreError`] if the file exists but cannot be
    /// read or parsed.
    pub fn persistent(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let collections = if path.exists() {
            let bytes = std::fs::read(&path).map_err(|e| {
                RagError::store(BACKEND, format!("failed to read snapshot {}: {e}", path.display()))
            })?;
            let loaded: HashMap<String, Collection> = serde_json::from_slice(&bytes).map_err(|e| {
                RagError::store(BACKEND, format!("corrupt snapshot {}: {e}", path.display()))
            })?;
            info!(
                path = %path.display(),
                collections = loaded.len(),
                "loaded vector store snapshot"
            );
            loaded
        } else {
            HashMap::new()
        };

        Ok(Self { collections: RwLock::new(collections), snapshot: Some(path) })
    }

    async fn persist(&self, collections: &HashMap<String, Collection>) -> Result<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(collections)
            .map_err(|e| RagError::store(BACKEND, format!("failed to encode snapshot: {e}")))?;

        // write-then-rename so a crash never leaves a truncated snapshot
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| {
                RagError::store(BACKEND, format!("failed to write {}: {e}", tmp.display()))
            })?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| {
                RagError::store(BACKEND, format!("failed to replace {}: {e}", path.display()))
            })?;
        debug!(path = %path.display(), "snapshot written");
        Ok(())
    }
}

fn missing(collection: &str) -> RagError {
    RagError::store(BACKEND, format!("collection '{collection}' does not exist"))
}

/// Cosine distance `1 - cos(a, b)`, in `[0, 2]`.
///
/// A zero-magnitude vector is treated as orthogonal to everything (distance 1).
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    (1.0 - dot / (norm_a * norm_b)).clamp(0.0, 2.0)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    /// Idempotent for a matching dimensionality. An existing empty collection
    /// adopts the new dimensionality; a non-empty one with different
    /// dimensions is an error.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        let previous = match collections.get_mut(name) {
            Some(existing) if existing.dimensions == dimensions => return Ok(()),
            Some(existing) if !existing.records.is_empty() => {
                return Err(RagError::store(
                    BACKEND,
                    format!(
                        "collection '{name}' holds {}-dimensional vectors, \
                         embedder produces {dimensions}",
                        existing.dimensions
                    ),
                ));
            }
            Some(existing) => Some(std::mem::replace(&mut existing.dimensions, dimensions)),
            None => {
                let collection = Collection { dimensions, records: Vec::new() };
                collections.insert(name.to_string(), collection);
                None
            }
        };

        if let Err(e) = self.persist(&collections).await {
            match previous {
                Some(old) => {
                    if let Some(existing) = collections.get_mut(name) {
                        existing.dimensions = old;
                    }
                }
                None => {
                    collections.remove(name);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        if let Some(removed) = collections.remove(name) {
            if let Err(e) = self.persist(&collections).await {
                collections.insert(name.to_string(), removed);
                return Err(e);
            }
        }
        Ok(())
    }

    async fn add(&self, collection: &str, records: &[EmbeddedChunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;

        if let Some(bad) = records.iter().find(|r| r.embedding.len() != store.dimensions) {
            return Err(RagError::store(
                BACKEND,
                format!(
                    "chunk '{}' has {} dimensions, collection '{collection}' expects {}",
                    bad.chunk.id,
                    bad.embedding.len(),
                    store.dimensions
                ),
            ));
        }
        let before = store.records.len();
        store.records.extend_from_slice(records);

        if let Err(e) = self.persist(&collections).await {
            if let Some(store) = collections.get_mut(collection) {
                store.records.truncate(before);
            }
            return Err(e);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<StoreMatch>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;

        if !store.records.is_empty() && embedding.len() != store.dimensions {
            return Err(RagError::store(
                BACKEND,
                format!(
                    "query has {} dimensions, collection '{collection}' expects {}",
                    embedding.len(),
                    store.dimensions
                ),
            ));
        }

        let mut scored: Vec<StoreMatch> = store
            .records
            .iter()
            .map(|record| StoreMatch {
                chunk: record.chunk.clone(),
                distance: cosine_distance(&record.embedding, embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        collections.get(collection).map(|c| c.records.len()).ok_or_else(|| missing(collection))
    }
}
