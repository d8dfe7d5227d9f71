//! Prompt construction.
//!
//! [`PromptBuilder::build`] is pure: the same query and chunks always give the
//! same prompt. With no chunks it produces a short general-assistant prompt;
//! with chunks it lists each one under a `Source:` label and places the query
//! after all of them.

use std::fmt::Write as _;

use docchat_rag::RetrievalResult;
use serde::{Deserialize, Serialize};

/// Which template family to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// Short instructions, top 3 chunks of at most 500 characters.
    #[default]
    Compact,
    /// Longer instructions and relevance scores, up to 5 chunks of 1500 characters.
    Detailed,
}

const COMPACT_GENERAL: &str = "You are a helpful AI assistant. Answer concisely.";

const COMPACT_GROUNDED: &str = "You are an AI assistant that answers questions based on provided \
documents. Prioritize the document content, be concise, and reference the documents when relevant. \
If you need to go beyond the documents, say so.";

const DETAILED_GENERAL: &str = "You are a helpful and friendly AI assistant. Engage naturally and \
answer the user's questions conversationally.";

const DETAILED_GROUNDED: &str = "You are a knowledgeable and friendly AI assistant that answers \
questions based on provided documents.

DOCUMENT-BASED RESPONSES:
- Always prioritize information from the provided documents
- Clearly reference which document you are drawing information from
- If information is incomplete, acknowledge it and suggest what additional context might help

COMMUNICATION STYLE:
- Be warm and conversational while remaining accurate
- Use phrases like \"Based on the documents provided...\" or \
\"According to the information I found...\"
- If you need to go beyond the documents, clearly state when you are doing so
- Explain complex information from the documents in simple terms";

const DETAILED_CLOSING: &str = "Please answer the question based on the provided documents. If the \
documents don't contain sufficient information to answer the question, state that clearly and \
explain what information is missing.";

/// Builds the exact text sent to the model.
///
/// # Example
///
/// ```rust
/// use docchat_chat::PromptBuilder;
///
/// let prompt = PromptBuilder::compact().build("What is Rust?", &[]);
/// assert!(prompt.ends_with("User: What is Rust?\nAssistant:"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    style: PromptStyle,
    max_context_chunks: usize,
    max_chunk_chars: usize,
}

impl PromptBuilder {
    /// Compact style: 3 chunks, 500 characters each.
    pub fn compact() -> Self {
        Self { style: PromptStyle::Compact, max_context_chunks: 3, max_chunk_chars: 500 }
    }

    /// Detailed style: 5 chunks, 1500 characters each.
    pub fn detailed() -> Self {
        Self { style: PromptStyle::Detailed, max_context_chunks: 5, max_chunk_chars: 1500 }
    }

    /// Builder with the default limits of `style`.
    pub fn for_style(style: PromptStyle) -> Self {
        match style {
            PromptStyle::Compact => Self::compact(),
            PromptStyle::Detailed => Self::detailed(),
        }
    }

    /// Override how many chunks are included.
    pub fn with_max_context_chunks(mut self, max: usize) -> Self {
        self.max_context_chunks = max;
        self
    }

    /// Override the per-chunk character limit.
    pub fn with_max_chunk_chars(mut self, max: usize) -> Self {
        self.max_chunk_chars = max;
        self
    }

    pub fn style(&self) -> PromptStyle {
        self.style
    }

    /// Number of chunks from `context` that [`build`](Self::build) will use.
    pub fn chunks_used(&self, context: &[RetrievalResult]) -> usize {
        context.len().min(self.max_context_chunks)
    }

    /// Build the prompt for `query` grounded in `context`, best match first.
    pub fn build(&self, query: &str, context: &[RetrievalResult]) -> String {
        let context = &context[..self.chunks_used(context)];
        match (self.style, context.is_empty()) {
            (PromptStyle::Compact, true) => {
                format!("{COMPACT_GENERAL}\n\nUser: {query}\nAssistant:")
            }
            (PromptStyle::Detailed, true) => {
                format!("{DETAILED_GENERAL}\nUser: {query}\nAssistant:")
            }
            (PromptStyle::Compact, false) => self.compact_grounded(query, context),
            (PromptStyle::Detailed, false) => self.detailed_grounded(query, context),
        }
    }

    fn compact_grounded(&self, query: &str, context: &[RetrievalResult]) -> String {
        let mut prompt = format!("{COMPACT_GROUNDED}\n\nRelevant information:\n");
        for (i, result) in context.iter().enumerate() {
            let _ = writeln!(
                prompt,
                "{}. (Source: {}) {}",
                i + 1,
                result.chunk.source_file,
                truncate_chars(&result.chunk.text, self.max_chunk_chars)
            );
        }
        let _ = write!(prompt, "\nUser Question: {query}\nAssistant:");
        prompt
    }

    fn detailed_grounded(&self, query: &str, context: &[RetrievalResult]) -> String {
        let mut prompt = format!("{DETAILED_GROUNDED}\n\n--- RELEVANT DOCUMENTS ---\n");
        for (i, result) in context.iter().enumerate() {
            let _ = write!(
                prompt,
                "\nDocument {} (Source: {}, Relevance: {:.2}):\n{}\n",
                i + 1,
                result.chunk.source_file,
                result.similarity_score,
                truncate_chars(&result.chunk.text, self.max_chunk_chars)
            );
        }
        let _ = write!(
            prompt,
            "\n--- END OF DOCUMENTS ---\n\n{DETAILED_CLOSING}\n\nUser Question: {query}\n\nAnswer:"
        );
        prompt
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::compact()
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
