//! The [`LanguageModel`] trait and the types that flow through it.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::options::DecodingOptions;

/// A single non-streaming completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub options: DecodingOptions,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, options: DecodingOptions) -> Self {
        Self { prompt: prompt.into(), options }
    }
}

/// A completed generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generation {
    /// Generated text, trimmed.
    pub text: String,
    /// Model that produced the text.
    pub model: String,
    /// Tokens the model read from the prompt.
    pub prompt_tokens: u32,
    /// Tokens the model generated.
    pub response_tokens: u32,
}

/// What the model server reports about the configured model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelAvailability {
    /// Whether the server answered.
    pub available: bool,
    pub current_model: String,
    pub available_models: Vec<String>,
    /// Whether the configured model is among `available_models`.
    pub model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModelAvailability {
    /// Availability for a server that could not be queried.
    pub fn unreachable(current_model: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            available: false,
            current_model: current_model.into(),
            available_models: Vec::new(),
            model_loaded: false,
            error: Some(error.into()),
        }
    }

    /// Availability built from the server's model list.
    pub fn from_listing(current_model: impl Into<String>, available_models: Vec<String>) -> Self {
        let current_model = current_model.into();
        let model_loaded = available_models.iter().any(|m| same_model(m, &current_model));
        Self { available: true, current_model, available_models, model_loaded, error: None }
    }

    /// Server reachable and model present.
    pub fn is_ready(&self) -> bool {
        self.available && self.model_loaded
    }
}

/// Whether two model tags name the same model, ignoring the `:variant` suffix.
pub fn same_model(a: &str, b: &str) -> bool {
    let base = |name: &str| name.split(':').next().unwrap_or(name).to_string();
    base(a) == base(b)
}

/// A text-generation backend.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_model::{DecodingOptions, GenerateRequest, LanguageModel, OllamaClient};
///
/// let model = OllamaClient::new("http://localhost:11434", "llama3.1:8b")?;
/// let generation = model.generate(GenerateRequest::new("Hello", DecodingOptions::fast())).await?;
/// println!("{}", generation.text);
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Configured model name.
    fn name(&self) -> &str;

    /// Generate a completion for the prompt.
    ///
    /// Implementations honour `request.options.timeout` and report an
    /// overrun as [`ModelError::Timeout`](crate::ModelError::Timeout).
    async fn generate(&self, request: GenerateRequest) -> Result<Generation>;

    /// Query the server for the models it has. Never fails; problems are
    /// reported in [`ModelAvailability::error`].
    async fn availability(&self) -> ModelAvailability;
}

/// Outcome of [`test_connection`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Check that the model is available, then ask it to say hello.
pub async fn test_connection(
    model: &dyn LanguageModel,
    options: DecodingOptions,
) -> ConnectionReport {
    let availability = model.availability().await;
    if !availability.is_ready() {
        warn!(
            model = model.name(),
            available = availability.available,
            models = ?availability.available_models,
            "model server not ready"
        );
        return ConnectionReport {
            success: false,
            message: "Cannot connect to Ollama. Please ensure Ollama is running.".to_string(),
            suggestions: vec![
                "1. Install Ollama from https://ollama.ai/".to_string(),
                format!("2. Run 'ollama pull {}' to download the model", model.name()),
                "3. Ensure Ollama is running on the default port (11434)".to_string(),
            ],
            model_response: None,
            error: availability.error,
        };
    }

    match model.generate(GenerateRequest::new("Hello", options)).await {
        Ok(generation) => {
            info!(model = model.name(), "connection test succeeded");
            ConnectionReport {
                success: true,
                message: "Connection successful!".to_string(),
                suggestions: Vec::new(),
                model_response: Some(generation.text),
                error: None,
            }
        }
        Err(e) => {
            warn!(model = model.name(), error = %e, "connection test generation failed");
            ConnectionReport {
                success: false,
                message: "Connection failed".to_string(),
                suggestions: Vec::new(),
                model_response: None,
                error: Some(e.to_string()),
            }
        }
    }
}
