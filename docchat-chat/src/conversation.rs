//! Conversation turns and the in-process store that keeps them.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Oldest turns are dropped once a conversation grows past this.
const MAX_STORED_TURNS: usize = 200;

/// Whether a query is answered from documents or from the model alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[default]
    General,
    Document,
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => f.write_str("general"),
            Self::Document => f.write_str("document"),
        }
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "document" | "documents" => Ok(Self::Document),
            other => Err(format!("unknown chat mode '{other}' (expected general or document)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Details attached to an assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMetadata {
    pub model: String,
    /// Number of retrieved chunks the prompt was built from.
    pub context_used: usize,
    pub prompt_tokens: u32,
    pub response_tokens: u32,
    /// Seconds from receiving the query to having the answer.
    pub processing_time: f64,
    /// Distinct source labels of the retrieved chunks, best match first.
    pub sources: Vec<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub mode: ChatMode,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TurnMetadata>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>, mode: ChatMode) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            mode,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn assistant(content: impl Into<String>, mode: ChatMode, metadata: TurnMetadata) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            mode,
            timestamp: Utc::now(),
            metadata: Some(metadata),
        }
    }
}

/// Oldest-touched conversation is evicted when a new one would exceed this.
pub const MAX_CONVERSATIONS: usize = 1000;

#[derive(Debug, Default)]
struct Slot {
    turns: Mutex<Vec<ChatTurn>>,
    touched: AtomicU64,
}

/// Conversations keyed by id, held in memory for the life of the process.
///
/// Cloning is cheap and clones share the same conversations. At most
/// `max_conversations` are kept; creating one more evicts the conversation
/// that was appended to least recently.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    conversations: Arc<RwLock<HashMap<String, Arc<Slot>>>>,
    clock: Arc<AtomicU64>,
    max_conversations: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self {
            conversations: Arc::default(),
            clock: Arc::default(),
            max_conversations: MAX_CONVERSATIONS,
        }
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of conversations held. Zero is treated as one.
    pub fn with_max_conversations(mut self, max: usize) -> Self {
        self.max_conversations = max.max(1);
        self
    }

    async fn ensure(&self, conversation_id: &str) -> Arc<Slot> {
        if let Some(slot) = self.conversations.read().await.get(conversation_id) {
            return Arc::clone(slot);
        }
        let mut conversations = self.conversations.write().await;
        if !conversations.contains_key(conversation_id)
            && conversations.len() >= self.max_conversations
        {
            let stalest = conversations
                .iter()
                .min_by_key(|(_, slot)| slot.touched.load(Ordering::Relaxed))
                .map(|(id, _)| id.clone());
            if let Some(id) = stalest {
                debug!(conversation_id = %id, "evicting least recently used conversation");
                conversations.remove(&id);
            }
        }
        Arc::clone(conversations.entry(conversation_id.to_string()).or_default())
    }

    /// Append turns in order, creating the conversation if needed.
    pub async fn append(
        &self,
        conversation_id: &str,
        new_turns: impl IntoIterator<Item = ChatTurn>,
    ) {
        let slot = self.ensure(conversation_id).await;
        slot.touched.store(self.clock.fetch_add(1, Ordering::Relaxed) + 1, Ordering::Relaxed);
        let mut turns = slot.turns.lock().await;
        turns.extend(new_turns);
        if turns.len() > MAX_STORED_TURNS {
            let drain_to = turns.len() - MAX_STORED_TURNS;
            turns.drain(0..drain_to);
        }
    }

    /// Turns of a conversation, oldest first. Empty for an unknown id.
    pub async fn history(&self, conversation_id: &str) -> Vec<ChatTurn> {
        let slot = self.conversations.read().await.get(conversation_id).cloned();
        match slot {
            Some(slot) => slot.turns.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Forget a conversation. Returns whether it existed.
    pub async fn clear(&self, conversation_id: &str) -> bool {
        self.conversations.write().await.remove(conversation_id).is_some()
    }

    pub async fn contains(&self, conversation_id: &str) -> bool {
        self.conversations.read().await.contains_key(conversation_id)
    }

    /// Number of conversations held.
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
