//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//! Collections are created with cosine distance; Qdrant reports cosine
//! *similarity* as its score, which is converted back to a distance here so
//! every backend speaks the same unit.
//!
//! # Example
//!
//! ```rust,ignore
//! use docchat_rag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334")?;
//! store.create_collection("docs", 384).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::debug;

use crate::document::{DocumentChunk, EmbeddedChunk, StoreMatch};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "qdrant";

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Create a new Qdrant vector store connecting to the given URL.
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(Self::map_err)?;
        Ok(Self { client })
    }

    /// Create a new Qdrant vector store from an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    fn map_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::store(BACKEND, e.to_string())
    }

    fn string_field(payload: &std::collections::HashMap<String, QdrantValue>, key: &str) -> String {
        match payload.get(key).and_then(|v| v.kind.as_ref()) {
            Some(Kind::StringValue(s)) => s.clone(),
            _ => String::new(),
        }
    }

    fn usize_field(payload: &std::collections::HashMap<String, QdrantValue>, key: &str) -> usize {
        match payload.get(key).and_then(|v| v.kind.as_ref()) {
            Some(Kind::IntegerValue(n)) => usize::try_from(*n).unwrap_or_default(),
            Some(Kind::DoubleValue(n)) => *n as usize,
            _ => 0,
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        if self.client.collection_exists(name).await.map_err(Self::map_err)? {
            debug!(collection = name, "qdrant collection already exists, skipping creation");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection = name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        if !self.client.collection_exists(name).await.map_err(Self::map_err)? {
            return Ok(());
        }
        self.client.delete_collection(name).await.map_err(Self::map_err)?;
        debug!(collection = name, "deleted qdrant collection");
        Ok(())
    }

    async fn add(&self, collection: &str, records: &[EmbeddedChunk]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let points = records
            .iter()
            .map(|record| {
                let value = serde_json::to_value(&record.chunk).map_err(|e| {
                    RagError::store(BACKEND, format!("failed to encode payload: {e}"))
                })?;
                let payload = Payload::try_from(value)
                    .map_err(|e| RagError::store(BACKEND, format!("invalid payload: {e}")))?;
                Ok(PointStruct::new(record.chunk.id.clone(), record.embedding.clone(), payload))
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(Self::map_err)?;

        debug!(collection, count = records.len(), "added chunks to qdrant");
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<StoreMatch>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, embedding.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(Self::map_err)?;

        let matches = response
            .result
            .into_iter()
            .map(|scored| {
                let id = scored
                    .id
                    .as_ref()
                    .and_then(|pid| match &pid.point_id_options {
                        Some(PointIdOptions::Uuid(s)) => Some(s.clone()),
                        Some(PointIdOptions::Num(n)) => Some(n.to_string()),
                        None => None,
                    })
                    .unwrap_or_default();
                let payload = &scored.payload;
                let created_at =
                    DateTime::parse_from_rfc3339(&Self::string_field(payload, "created_at"))
                        .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());

                StoreMatch {
                    chunk: DocumentChunk {
                        id,
                        text: Self::string_field(payload, "text"),
                        source_file: Self::string_field(payload, "source_file"),
                        file_path: Self::string_field(payload, "file_path"),
                        chunk_index: Self::usize_field(payload, "chunk_index"),
                        chunk_count: Self::usize_field(payload, "chunk_count"),
                        created_at,
                    },
                    distance: (1.0 - scored.score).clamp(0.0, 2.0),
                }
            })
            .collect();

        Ok(matches)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(collection).exact(true))
            .await
            .map_err(Self::map_err)?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or_default())
    }
}
