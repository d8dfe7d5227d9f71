//! Ollama embedding provider using the local `/api/embed` endpoint.
//!
//! The whole batch goes out in one request, which bounds concurrent load on
//! the model server to a single call per ingested file.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The default Ollama server address.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// The default embedding model (`all-MiniLM-L6-v2` packaged for Ollama).
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";

/// Output dimensionality of [`DEFAULT_EMBEDDING_MODEL`].
pub const DEFAULT_DIMENSIONS: usize = 384;

const PROVIDER: &str = "Ollama";

/// An [`EmbeddingProvider`] backed by a local Ollama server.
///
/// # Configuration
///
/// - `base_url` - defaults to `http://localhost:11434`.
/// - `model` - defaults to `all-minilm`.
/// - `dimensions` - must match the model; responses of any other length are rejected.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::ollama::OllamaEmbeddingProvider;
///
/// let provider = OllamaEmbeddingProvider::new("http://localhost:11434")?
///     .with_model("nomic-embed-text", 768);
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbeddingProvider {
    /// Create a provider for the server at `base_url` with the default model.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(60))
    }

    /// Create a provider whose requests give up after `timeout`.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(RagError::embedding(PROVIDER, "base URL must not be empty"));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                RagError::embedding(PROVIDER, format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/embed", base_url.trim_end_matches('/')),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Use a different model and its output dimensionality.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding(PROVIDER, "API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let request_body = EmbedRequest { model: &self.model, input: texts.to_vec() };

        let response =
            self.client.post(&self.endpoint).json(&request_body).send().await.map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::embedding(PROVIDER, format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(RagError::embedding(PROVIDER, format!("API returned {status}: {detail}")));
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::embedding(PROVIDER, format!("failed to parse response: {e}"))
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(RagError::embedding(
                PROVIDER,
                format!("expected {} embeddings, got {}", texts.len(), parsed.embeddings.len()),
            ));
        }
        if let Some(bad) = parsed.embeddings.iter().find(|e| e.len() != self.dimensions) {
            return Err(RagError::embedding(
                PROVIDER,
                format!(
                    "model '{}' returned {} dimensions, expected {}",
                    self.model,
                    bad.len(),
                    self.dimensions
                ),
            ));
        }

        Ok(parsed.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_base_url() {
        assert!(OllamaEmbeddingProvider::new("  ").is_err());
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let provider = OllamaEmbeddingProvider::new("http://127.0.0.1:11434/").unwrap();
        assert_eq!(provider.endpoint, "http://127.0.0.1:11434/api/embed");
        assert_eq!(provider.model_name(), DEFAULT_EMBEDDING_MODEL);
        assert_eq!(provider.dimensions(), DEFAULT_DIMENSIONS);
    }

    #[tokio::test]
    async fn unreachable_server_is_an_embedding_error() {
        // port 9 (discard) is closed on test hosts
        let provider =
            OllamaEmbeddingProvider::with_timeout("http://127.0.0.1:9", Duration::from_secs(2))
                .unwrap()
                .with_model("tiny", 4);
        let err = provider.embed_batch(&["hello"]).await.unwrap_err();
        assert!(matches!(
            err,
            RagError::EmbeddingError { ref provider, .. } if provider == "Ollama"
        ));
    }

    #[tokio::test]
    async fn empty_batch_skips_the_network() {
        let provider = OllamaEmbeddingProvider::new("http://127.0.0.1:9").unwrap();
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }
}
