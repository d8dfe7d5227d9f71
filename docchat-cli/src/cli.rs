use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use docchat_chat::ChatMode;
use docchat_model::{DEFAULT_MODEL, DecodingProfile};
use docchat_rag::DEFAULT_COLLECTION;
use docchat_telemetry::LogFormat;

#[derive(Parser, Debug)]
#[command(
    name = "docchat",
    version,
    about = "Chat with a local Ollama model, optionally grounded in your documents"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Ollama server used for generation and, with `--embedder ollama`, embeddings.
    #[arg(long, global = true, env = "OLLAMA_BASE_URL", default_value = "http://localhost:11434")]
    pub ollama_url: String,

    /// Generation model.
    #[arg(long, global = true, env = "DOCCHAT_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(
        long,
        global = true,
        env = "DOCCHAT_EMBEDDER",
        value_enum,
        default_value_t = EmbedderKind::Ollama
    )]
    pub embedder: EmbedderKind,

    /// Ollama embedding model, used with `--embedder ollama`.
    #[arg(long, global = true, env = "DOCCHAT_EMBEDDING_MODEL", default_value = "all-minilm")]
    pub embedding_model: String,

    /// Vector length produced by the embedding model.
    #[arg(long, global = true, env = "DOCCHAT_EMBEDDING_DIMENSIONS", default_value_t = 384)]
    pub embedding_dimensions: usize,

    /// JSON snapshot backing the vector store.
    #[arg(long, global = true, env = "DOCCHAT_STORE_PATH", default_value = "./docchat_store.json")]
    pub store_path: PathBuf,

    #[arg(long, global = true, env = "DOCCHAT_COLLECTION", default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    #[arg(long, global = true, env = "DOCCHAT_CHUNK_SIZE", default_value_t = 1000)]
    pub chunk_size: usize,

    #[arg(long, global = true, env = "DOCCHAT_CHUNK_OVERLAP", default_value_t = 200)]
    pub chunk_overlap: usize,

    /// Chunks retrieved per document-mode question.
    #[arg(long, global = true, env = "DOCCHAT_TOP_K", default_value_t = 5)]
    pub top_k: usize,

    /// Reported in stats; results are not filtered by it.
    #[arg(long, global = true, env = "DOCCHAT_SIMILARITY_THRESHOLD", default_value_t = 0.7)]
    pub similarity_threshold: f32,

    /// `fast` uses the compact prompt and short answers, `detailed` the long ones.
    #[arg(long, global = true, env = "DOCCHAT_PROFILE", default_value = "fast")]
    pub profile: DecodingProfile,

    #[arg(long, global = true, env = "DOCCHAT_LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum EmbedderKind {
    /// Ollama `/api/embed`.
    Ollama,
    /// Offline bag-of-words hashing, no server needed.
    Hashing,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Add documents to the collection.
    Ingest(IngestArgs),
    /// Ask one question and print the answer.
    Ask(AskArgs),
    /// Interactive chat.
    Chat(ChatArgs),
    /// Show collection statistics.
    Stats,
    /// Delete every stored chunk.
    Clear,
    /// List the models the Ollama server has.
    Models,
    /// Check the model server and run a short generation.
    TestConnection,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "DOCCHAT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "DOCCHAT_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Per-file upload limit in megabytes.
    #[arg(
        long,
        env = "DOCCHAT_MAX_UPLOAD_MB",
        default_value_t = docchat_server::DEFAULT_MAX_UPLOAD_MB
    )]
    pub max_upload_mb: usize,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// PDF, DOCX or TXT files.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct AskArgs {
    pub question: String,

    #[arg(long, default_value = "general")]
    pub mode: ChatMode,
}

#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    #[arg(long, default_value = "general")]
    pub mode: ChatMode,
}
