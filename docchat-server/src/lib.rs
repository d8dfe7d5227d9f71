//! `docchat-server` exposes the chat orchestrator and the retrieval pipeline over HTTP.
//!
//! Errors are returned as `{"detail": "..."}` with a matching status code.

pub mod api;
pub mod error;
pub mod server;

pub use api::{ChatRequest, ConversationHistory, HealthResponse, UploadResponse};
pub use error::ApiError;
pub use server::{
    AppState, DEFAULT_MAX_UPLOAD_MB, ServerConfig, WORKER_PERMITS, app_router, run_server,
};
