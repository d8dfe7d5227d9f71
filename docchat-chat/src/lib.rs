//! # docchat-chat
//!
//! Turns a user query into an answer.
//!
//! - [`PromptBuilder`] - pure query + chunks → prompt text, `compact` or `detailed`
//! - [`ChatOrchestrator`] - general or document mode, model call, apology on failure
//! - [`ConversationStore`] - per-conversation turn history kept in memory
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docchat_chat::{ChatMode, ChatOrchestrator};
//!
//! let orchestrator = ChatOrchestrator::builder()
//!     .model(Arc::new(ollama_client))
//!     .retriever(Arc::new(pipeline))
//!     .build()?;
//!
//! let question = "What does the contract say about renewals?";
//! let reply = orchestrator.respond(question, ChatMode::Document, None).await?;
//! println!("{} (sources: {:?})", reply.response, reply.metadata.sources);
//! ```

pub mod conversation;
pub mod error;
pub mod orchestrator;
pub mod prompt;

pub use conversation::{ChatMode, ChatTurn, ConversationStore, Role, TurnMetadata};
pub use error::{ChatError, Result};
pub use orchestrator::{
    ChatOrchestrator, ChatOrchestratorBuilder, ChatResponse, DEFAULT_TOP_K, new_conversation_id,
};
pub use prompt::{PromptBuilder, PromptStyle};
