//! The chat orchestrator.
//!
//! [`ChatOrchestrator::respond`] runs one exchange: validate the query,
//! retrieve context in document mode, build the prompt, call the model, and
//! record both turns in the conversation. A model failure still produces a
//! [`ChatResponse`], carrying an apology and `success: false`.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use docchat_model::{
    DecodingOptions, GenerateRequest, Generation, LanguageModel, ModelAvailability, ModelError,
};
use docchat_rag::{RetrievalResult, Retriever};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::conversation::{ChatMode, ChatTurn, ConversationStore, TurnMetadata};
use crate::error::{ChatError, Result};
use crate::prompt::PromptBuilder;

/// Default number of chunks retrieved per document-mode query.
pub const DEFAULT_TOP_K: usize = 5;

/// The answer to one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Model answer, or an apology when `metadata.success` is false.
    pub response: String,
    pub mode: ChatMode,
    /// Seconds spent producing the answer.
    pub processing_time: f64,
    pub conversation_id: String,
    pub metadata: TurnMetadata,
}

/// Coordinates retrieval, prompting, and generation.
///
/// Construct one via [`ChatOrchestrator::builder()`].
pub struct ChatOrchestrator {
    model: Arc<dyn LanguageModel>,
    retriever: Option<Arc<dyn Retriever>>,
    prompt_builder: PromptBuilder,
    options: DecodingOptions,
    top_k: usize,
    conversations: ConversationStore,
}

impl ChatOrchestrator {
    pub fn builder() -> ChatOrchestratorBuilder {
        ChatOrchestratorBuilder::default()
    }

    pub fn model(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }

    /// Whether document mode can be served.
    pub fn has_retriever(&self) -> bool {
        self.retriever.is_some()
    }

    pub fn options(&self) -> &DecodingOptions {
        &self.options
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    /// Answer `query` in `mode`, appending both turns to the conversation.
    ///
    /// A missing `conversation_id` becomes `conv_{unix_seconds}`.
    ///
    /// # Errors
    ///
    /// - [`ChatError::EmptyQuery`] for a blank query
    /// - [`ChatError::ServiceUnavailable`] for document mode without a retriever
    #[instrument(skip(self, query), fields(mode = %mode, query_len = query.len()))]
    pub async fn respond(
        &self,
        query: &str,
        mode: ChatMode,
        conversation_id: Option<String>,
    ) -> Result<ChatResponse> {
        if query.trim().is_empty() {
            return Err(ChatError::EmptyQuery);
        }
        let started = Instant::now();
        let conversation_id = conversation_id.unwrap_or_else(new_conversation_id);

        let context = match mode {
            ChatMode::General => Vec::new(),
            ChatMode::Document => {
                let retriever = self.retriever.as_ref().ok_or_else(|| {
                    ChatError::ServiceUnavailable("Document processor".to_string())
                })?;
                retriever.search(query, self.top_k).await
            }
        };
        debug!(retrieved = context.len(), "context ready");

        let prompt = self.prompt_builder.build(query, &context);
        let context_used = self.prompt_builder.chunks_used(&context);
        let sources = distinct_sources(&context[..context_used]);
        let outcome = self.generate(prompt).await;
        let processing_time = started.elapsed().as_secs_f64();

        let (response, metadata) = match outcome {
            Ok(generation) => {
                info!(
                    conversation_id = %conversation_id,
                    context_used,
                    response_tokens = generation.response_tokens,
                    processing_time,
                    "response generated"
                );
                let metadata = TurnMetadata {
                    model: generation.model,
                    context_used,
                    prompt_tokens: generation.prompt_tokens,
                    response_tokens: generation.response_tokens,
                    processing_time,
                    sources,
                    success: true,
                    error: None,
                };
                (generation.text, metadata)
            }
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "model call failed");
                let metadata = TurnMetadata {
                    model: self.model.name().to_string(),
                    context_used,
                    prompt_tokens: 0,
                    response_tokens: 0,
                    processing_time,
                    sources,
                    success: false,
                    error: Some(e.to_string()),
                };
                (e.apology().to_string(), metadata)
            }
        };

        self.conversations
            .append(
                &conversation_id,
                [
                    ChatTurn::user(query, mode),
                    ChatTurn::assistant(response.clone(), mode, metadata.clone()),
                ],
            )
            .await;

        Ok(ChatResponse { response, mode, processing_time, conversation_id, metadata })
    }

    /// Model call bounded by the configured timeout, whatever the backend does.
    async fn generate(&self, prompt: String) -> std::result::Result<Generation, ModelError> {
        let request = GenerateRequest::new(prompt, self.options.clone());
        match tokio::time::timeout(self.options.timeout, self.model.generate(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ModelError::Timeout),
        }
    }

    /// Turns of a conversation, oldest first.
    pub async fn history(&self, conversation_id: &str) -> Vec<ChatTurn> {
        self.conversations.history(conversation_id).await
    }

    /// Forget a conversation. Returns whether it existed.
    pub async fn clear_conversation(&self, conversation_id: &str) -> bool {
        self.conversations.clear(conversation_id).await
    }

    /// Ask the model backend which models it has.
    pub async fn model_status(&self) -> ModelAvailability {
        self.model.availability().await
    }
}

/// `conv_<unix seconds>_<8 hex>`, unique across requests in the same second.
pub fn new_conversation_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("conv_{}_{}", Utc::now().timestamp(), &suffix[..8])
}

/// Source labels in retrieval order, first occurrence wins.
fn distinct_sources(context: &[RetrievalResult]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for result in context {
        if !sources.contains(&result.chunk.source_file) {
            sources.push(result.chunk.source_file.clone());
        }
    }
    sources
}

/// Builder for [`ChatOrchestrator`]. Only `model` is required.
#[derive(Default)]
pub struct ChatOrchestratorBuilder {
    model: Option<Arc<dyn LanguageModel>>,
    retriever: Option<Arc<dyn Retriever>>,
    prompt_builder: Option<PromptBuilder>,
    options: Option<DecodingOptions>,
    top_k: Option<usize>,
    conversations: Option<ConversationStore>,
}

impl ChatOrchestratorBuilder {
    pub fn model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Enable document mode.
    pub fn retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Defaults to [`PromptBuilder::compact`].
    pub fn prompt_builder(mut self, builder: PromptBuilder) -> Self {
        self.prompt_builder = Some(builder);
        self
    }

    /// Defaults to [`DecodingOptions::fast`].
    pub fn options(mut self, options: DecodingOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Defaults to [`DEFAULT_TOP_K`].
    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Share an existing store instead of starting empty.
    pub fn conversations(mut self, store: ConversationStore) -> Self {
        self.conversations = Some(store);
        self
    }

    /// # Errors
    ///
    /// Returns [`ChatError::ServiceUnavailable`] if no model was set.
    pub fn build(self) -> Result<ChatOrchestrator> {
        let model =
            self.model.ok_or_else(|| ChatError::ServiceUnavailable("LLM service".to_string()))?;
        Ok(ChatOrchestrator {
            model,
            retriever: self.retriever,
            prompt_builder: self.prompt_builder.unwrap_or_default(),
            options: self.options.unwrap_or_default(),
            top_k: self.top_k.unwrap_or(DEFAULT_TOP_K).max(1),
            conversations: self.conversations.unwrap_or_default(),
        })
    }
}
