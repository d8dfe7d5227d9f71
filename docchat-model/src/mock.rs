//! A scriptable in-process [`LanguageModel`] for tests and offline use.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ModelError, Result};
use crate::model::{GenerateRequest, Generation, LanguageModel, ModelAvailability};

/// A [`LanguageModel`] that answers from a script and records every request.
///
/// By default it replies `"mock response"` immediately. A configured delay is
/// raced against the request's timeout, so a delay longer than the timeout
/// produces [`ModelError::Timeout`] just like a slow server would.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_model::{DecodingOptions, GenerateRequest, LanguageModel, MockModel};
///
/// let model = MockModel::new("mock").with_reply("hi there");
/// let generation = model.generate(GenerateRequest::new("hello", DecodingOptions::fast())).await?;
/// assert_eq!(generation.text, "hi there");
/// assert_eq!(model.call_count(), 1);
/// ```
#[derive(Debug)]
pub struct MockModel {
    name: String,
    reply: std::result::Result<String, ModelError>,
    delay: Option<Duration>,
    installed: Option<Vec<String>>,
    calls: Mutex<Vec<GenerateRequest>>,
}

impl MockModel {
    /// Create a mock that reports itself as `name` and is installed.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            installed: Some(vec![name.clone()]),
            name,
            reply: Ok("mock response".to_string()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reply with `text` to every request.
    pub fn with_reply(mut self, text: impl Into<String>) -> Self {
        self.reply = Ok(text.into());
        self
    }

    /// Fail every request with `error`.
    pub fn with_error(mut self, error: ModelError) -> Self {
        self.reply = Err(error);
        self
    }

    /// Wait `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report the server as unreachable from [`availability`](LanguageModel::availability).
    pub fn unreachable(mut self) -> Self {
        self.installed = None;
        self
    }

    /// Every request received so far, oldest first.
    pub fn calls(&self) -> Vec<GenerateRequest> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: GenerateRequest) -> Result<Generation> {
        let timeout = request.options.timeout;
        let prompt_tokens = request.prompt.split_whitespace().count() as u32;
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(request);

        if let Some(delay) = self.delay {
            if delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(ModelError::Timeout);
            }
            tokio::time::sleep(delay).await;
        }

        let text = self.reply.clone()?;
        Ok(Generation {
            response_tokens: text.split_whitespace().count() as u32,
            text,
            model: self.name.clone(),
            prompt_tokens,
        })
    }

    async fn availability(&self) -> ModelAvailability {
        match &self.installed {
            Some(models) => ModelAvailability::from_listing(&self.name, models.clone()),
            None => ModelAvailability::unreachable(&self.name, "connection refused"),
        }
    }
}
