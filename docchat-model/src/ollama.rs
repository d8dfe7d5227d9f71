//! Ollama text-generation client.
//!
//! Talks to a local Ollama server over its HTTP API:
//!
//! - `POST /api/generate` (non-streaming) for completions
//! - `GET /api/tags` for the installed models
//! - `POST /api/show` for details about the configured model

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{ModelError, Result};
use crate::model::{GenerateRequest, Generation, LanguageModel, ModelAvailability};
use crate::options::DecodingOptions;

/// The default Ollama server address.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// The default generation model.
pub const DEFAULT_MODEL: &str = "llama3.1:8b";

const TAGS_TIMEOUT: Duration = Duration::from_secs(5);
const SHOW_TIMEOUT: Duration = Duration::from_secs(10);

/// A [`LanguageModel`] backed by an Ollama server.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_model::{DecodingOptions, GenerateRequest, LanguageModel, OllamaClient};
///
/// let client = OllamaClient::new("http://localhost:11434", "llama3.1:8b")?;
/// let availability = client.availability().await;
/// if availability.model_loaded {
///     let reply = client.generate(GenerateRequest::new("Hi", DecodingOptions::fast())).await?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    /// Create a client for `model` on the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Config`] for a blank URL or model name.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let model = model.into();
        if base_url.trim().is_empty() {
            return Err(ModelError::Config("Ollama base URL must not be empty".into()));
        }
        if model.trim().is_empty() {
            return Err(ModelError::Config("model name must not be empty".into()));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ModelError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), model })
    }

    /// Server address without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Names of every model installed on the server.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self.client.get(self.url("/api/tags")).timeout(TAGS_TIMEOUT).send().await?;
        let response = check_status(response).await?;
        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Raw `/api/show` document for the configured model.
    pub async fn model_info(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(self.url("/api/show"))
            .timeout(SHOW_TIMEOUT)
            .json(&ShowRequest { name: &self.model })
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct GeneratePayload<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a DecodingOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Serialize)]
struct ShowRequest<'a> {
    name: &'a str,
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ModelError::Http { status: status.as_u16(), body })
}

// ── LanguageModel implementation ───────────────────────────────────

#[async_trait]
impl LanguageModel for OllamaClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerateRequest) -> Result<Generation> {
        debug!(
            model = %self.model,
            prompt_len = request.prompt.len(),
            num_predict = request.options.num_predict,
            timeout_secs = request.options.timeout.as_secs_f32(),
            "generating"
        );

        let payload = GeneratePayload {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
            options: &request.options,
        };

        let response = self
            .client
            .post(self.url("/api/generate"))
            .timeout(request.options.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let err = ModelError::from(e);
                error!(model = %self.model, error = %err, "generate request failed");
                err
            })?;

        let response = check_status(response).await.inspect_err(|e| {
            error!(model = %self.model, error = %e, "LLM request failed");
        })?;

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            let err = ModelError::from(e);
            error!(model = %self.model, error = %err, "failed to read generate response");
            err
        })?;

        info!(
            model = %self.model,
            prompt_tokens = parsed.prompt_eval_count,
            response_tokens = parsed.eval_count,
            "generation complete"
        );

        Ok(Generation {
            text: parsed.response.trim().to_string(),
            model: self.model.clone(),
            prompt_tokens: parsed.prompt_eval_count,
            response_tokens: parsed.eval_count,
        })
    }

    async fn availability(&self) -> ModelAvailability {
        match self.list_models().await {
            Ok(models) => ModelAvailability::from_listing(&self.model, models),
            Err(e) => {
                error!(base_url = %self.base_url, error = %e, "failed to list Ollama models");
                ModelAvailability::unreachable(&self.model, e.to_string())
            }
        }
    }
}
