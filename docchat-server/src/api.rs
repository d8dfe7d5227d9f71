//! Request and response bodies of the HTTP API.

use docchat_chat::{ChatMode, ChatTurn};
use docchat_rag::IngestReport;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub mode: ChatMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` when both the model and the document processor are up, else `degraded`.
    pub status: String,
    pub ollama_available: bool,
    pub document_processor_available: bool,
    pub total_documents: usize,
    pub message: String,
}

impl HealthResponse {
    pub fn new(
        ollama_available: bool,
        document_processor_available: bool,
        total_documents: usize,
    ) -> Self {
        let status =
            if ollama_available && document_processor_available { "healthy" } else { "degraded" };
        Self {
            status: status.to_string(),
            ollama_available,
            document_processor_available,
            total_documents,
            message: "API is running".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub processed: usize,
    pub failed: usize,
    pub total_chunks: usize,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl From<IngestReport> for UploadResponse {
    fn from(report: IngestReport) -> Self {
        Self {
            success: report.processed > 0,
            message: format!("Processed {} documents successfully", report.processed),
            processed: report.processed,
            failed: report.failed,
            total_chunks: report.total_chunks,
            errors: report.errors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationHistory {
    pub conversation_id: String,
    pub turns: Vec<ChatTurn>,
}
