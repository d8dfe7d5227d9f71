use std::{fmt, net::SocketAddr, path::Path as FsPath, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        multipart::MultipartError,
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use docchat_chat::{ChatOrchestrator, ChatResponse};
use docchat_rag::RetrievalPipeline;
use serde_json::json;
use tokio::sync::{Semaphore, SemaphorePermit};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{debug, info};

use crate::api::{ChatRequest, ConversationHistory, HealthResponse, UploadResponse};
use crate::error::ApiError;

/// Per-file upload limit in megabytes.
pub const DEFAULT_MAX_UPLOAD_MB: usize = 10;

/// Chat and ingestion requests allowed to run at once.
pub const WORKER_PERMITS: usize = 2;

/// Upload bodies may carry several files; the whole body is capped at this many per-file limits.
const MAX_FILES_PER_UPLOAD: usize = 8;

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<ChatOrchestrator>,
    pipeline: Option<Arc<RetrievalPipeline>>,
    workers: Arc<Semaphore>,
    max_upload_mb: usize,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("document_processor", &self.pipeline.is_some())
            .field("max_upload_mb", &self.max_upload_mb)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// State serving general chat only.
    pub fn new(orchestrator: Arc<ChatOrchestrator>) -> Self {
        Self {
            orchestrator,
            pipeline: None,
            workers: Arc::new(Semaphore::new(WORKER_PERMITS)),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }

    /// Enable the document routes. The orchestrator should retrieve from the same pipeline.
    pub fn with_pipeline(mut self, pipeline: Arc<RetrievalPipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn with_max_upload_mb(mut self, mb: usize) -> Self {
        self.max_upload_mb = mb.max(1);
        self
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    fn pipeline(&self) -> Result<&Arc<RetrievalPipeline>, ApiError> {
        self.pipeline
            .as_ref()
            .ok_or_else(|| ApiError::Unavailable("Document processor".to_string()))
    }

    async fn worker(&self) -> Result<SemaphorePermit<'_>, ApiError> {
        self.workers
            .acquire()
            .await
            .map_err(|_| ApiError::Unavailable("Worker pool".to_string()))
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state.max_upload_bytes().saturating_mul(MAX_FILES_PER_UPLOAD);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route(
            "/conversations/{conversation_id}",
            get(conversation_history).delete(clear_conversation),
        )
        .route("/upload-documents", post(upload_documents))
        .route("/documents", delete(clear_documents))
        .route("/documents/stats", get(document_stats))
        .route("/models", get(models))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::disable()),
        )
}

pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid host/port {}:{}", config.host, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("docchat API listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> impl IntoResponse {
    Json(json!({
        "message": "docchat API",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health",
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let ollama_available = state.orchestrator.model_status().await.available;
    let total_documents = match &state.pipeline {
        Some(pipeline) => pipeline.collection_stats().await.total_chunks,
        None => 0,
    };
    Json(HealthResponse::new(ollama_available, state.pipeline.is_some(), total_documents))
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Unprocessable(e.body_text()))?;
    let _permit = state.worker().await?;
    let response = state
        .orchestrator
        .respond(&request.message, request.mode, request.conversation_id)
        .await?;
    Ok(Json(response))
}

async fn conversation_history(
    Path(conversation_id): Path<String>,
    State(state): State<AppState>,
) -> Json<ConversationHistory> {
    let turns = state.orchestrator.history(&conversation_id).await;
    Json(ConversationHistory { conversation_id, turns })
}

async fn clear_conversation(
    Path(conversation_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.orchestrator.clear_conversation(&conversation_id).await {
        return Err(ApiError::NotFound(format!("Conversation {conversation_id} not found")));
    }
    Ok(Json(json!({ "message": format!("Conversation {conversation_id} cleared") })))
}

async fn upload_documents(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let pipeline = state.pipeline()?.clone();
    let limit = state.max_upload_bytes();
    let staging = tempfile::tempdir()
        .map_err(|e| ApiError::Internal(format!("Document processing failed: {e}")))?;

    let mut paths = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(raw_name) = field.file_name() else {
            continue;
        };
        let name = upload_file_name(raw_name, paths.len());
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.len() > limit {
            return Err(ApiError::PayloadTooLarge(format!(
                "File {name} too large (max {}MB)",
                state.max_upload_mb
            )));
        }

        // One directory per part so same-named files keep their own name and content.
        let dir = staging.path().join(paths.len().to_string());
        let path = dir.join(&name);
        stage_upload(&dir, &path, &bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("Document processing failed: {e}")))?;
        debug!(file = %name, bytes = bytes.len(), "upload staged");
        paths.push(path);
    }
    if paths.is_empty() {
        return Err(ApiError::Unprocessable("No files uploaded".to_string()));
    }

    let _permit = state.worker().await?;
    let report = pipeline.ingest_files(&paths).await;
    info!(
        processed = report.processed,
        failed = report.failed,
        total_chunks = report.total_chunks,
        "upload ingested"
    );
    Ok(Json(UploadResponse::from(report)))
}

async fn clear_documents(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state
        .pipeline()?
        .clear_all()
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to clear documents: {e}")))?;
    Ok(Json(json!({ "message": "All documents cleared successfully" })))
}

async fn document_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.pipeline()?.collection_stats().await))
}

async fn models(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.orchestrator.model_status().await)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

async fn stage_upload(dir: &FsPath, path: &FsPath, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir(dir).await?;
    tokio::fs::write(path, bytes).await
}

/// Base name of a client-supplied file name, so uploads stay inside the staging directory.
fn upload_file_name(raw: &str, index: usize) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    match FsPath::new(base).file_name().and_then(|n| n.to_str()) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("upload_{index}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_names_are_reduced_to_base_names() {
        assert_eq!(upload_file_name("report.pdf", 0), "report.pdf");
        assert_eq!(upload_file_name("../../etc/passwd", 0), "passwd");
        assert_eq!(upload_file_name("C:\\docs\\notes.txt", 0), "notes.txt");
        assert_eq!(upload_file_name("..", 3), "upload_3");
        assert_eq!(upload_file_name("", 1), "upload_1");
    }

    #[test]
    fn upload_limit_has_a_floor_of_one_megabyte() {
        let model = Arc::new(docchat_model::MockModel::new("m"));
        let orchestrator = ChatOrchestrator::builder().model(model).build().unwrap();
        let state = AppState::new(Arc::new(orchestrator)).with_max_upload_mb(0);
        assert_eq!(state.max_upload_bytes(), 1024 * 1024);
    }
}
