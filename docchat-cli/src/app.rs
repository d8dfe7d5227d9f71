//! Wiring from command-line arguments to the library crates, and the
//! one-shot subcommands.

use std::sync::Arc;

use anyhow::{Context, bail};
use docchat_chat::{ChatMode, ChatOrchestrator, PromptBuilder, PromptStyle};
use docchat_model::{DecodingProfile, LanguageModel, OllamaClient, test_connection};
use docchat_rag::{
    EmbeddingProvider, HashingEmbeddingProvider, InMemoryVectorStore, OllamaEmbeddingProvider,
    RagConfig, RetrievalPipeline,
};
use docchat_server::{AppState, ServerConfig, run_server};
use tracing::{info, warn};

use crate::cli::{AskArgs, ChatArgs, EmbedderKind, GlobalArgs, IngestArgs, ServeArgs};
use crate::repl;

/// Prompt template family matching a decoding profile.
pub fn prompt_style(profile: DecodingProfile) -> PromptStyle {
    match profile {
        DecodingProfile::Fast => PromptStyle::Compact,
        DecodingProfile::Detailed => PromptStyle::Detailed,
    }
}

pub fn rag_config(args: &GlobalArgs) -> anyhow::Result<RagConfig> {
    RagConfig::builder()
        .chunk_size(args.chunk_size)
        .chunk_overlap(args.chunk_overlap)
        .top_k(args.top_k)
        .similarity_threshold(args.similarity_threshold)
        .collection(args.collection.clone())
        .build()
        .context("invalid retrieval settings")
}

fn embedding_provider(args: &GlobalArgs) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match args.embedder {
        EmbedderKind::Ollama => Arc::new(
            OllamaEmbeddingProvider::new(args.ollama_url.clone())?
                .with_model(args.embedding_model.clone(), args.embedding_dimensions),
        ),
        EmbedderKind::Hashing => {
            Arc::new(HashingEmbeddingProvider::new(args.embedding_dimensions)?)
        }
    };
    Ok(provider)
}

/// Build and initialize the retrieval pipeline over the snapshot at `--store-path`.
pub async fn build_pipeline(args: &GlobalArgs) -> anyhow::Result<RetrievalPipeline> {
    let store = InMemoryVectorStore::persistent(&args.store_path)
        .with_context(|| format!("failed to open vector store {}", args.store_path.display()))?;
    let pipeline = RetrievalPipeline::builder()
        .config(rag_config(args)?)
        .embedding_provider(embedding_provider(args)?)
        .vector_store(Arc::new(store))
        .build()?;
    pipeline.initialize().await?;
    Ok(pipeline)
}

pub fn build_model(args: &GlobalArgs) -> anyhow::Result<Arc<OllamaClient>> {
    Ok(Arc::new(OllamaClient::new(args.ollama_url.clone(), args.model.clone())?))
}

/// Orchestrator over `model`, with document mode enabled when `pipeline` is given.
pub fn build_orchestrator(
    args: &GlobalArgs,
    model: Arc<dyn LanguageModel>,
    pipeline: Option<Arc<RetrievalPipeline>>,
) -> anyhow::Result<ChatOrchestrator> {
    let mut builder = ChatOrchestrator::builder()
        .model(model)
        .prompt_builder(PromptBuilder::for_style(prompt_style(args.profile)))
        .options(args.profile.options())
        .top_k(args.top_k);
    if let Some(pipeline) = pipeline {
        builder = builder.retriever(pipeline);
    }
    Ok(builder.build()?)
}

pub async fn serve(args: &GlobalArgs, serve: &ServeArgs) -> anyhow::Result<()> {
    let model = build_model(args)?;
    let pipeline = match build_pipeline(args).await {
        Ok(pipeline) => Some(Arc::new(pipeline)),
        Err(e) => {
            warn!(error = %e, "document processor unavailable, serving general chat only");
            None
        }
    };

    let orchestrator = build_orchestrator(args, model, pipeline.clone())?;
    let mut state = AppState::new(Arc::new(orchestrator)).with_max_upload_mb(serve.max_upload_mb);
    if let Some(pipeline) = pipeline {
        state = state.with_pipeline(pipeline);
    }

    info!(model = %args.model, profile = %args.profile, "starting docchat API");
    run_server(ServerConfig { host: serve.host.clone(), port: serve.port }, state).await
}

pub async fn ingest(args: &GlobalArgs, ingest: &IngestArgs) -> anyhow::Result<()> {
    let pipeline = build_pipeline(args).await?;
    let report = pipeline.ingest_files(&ingest.paths).await;

    println!(
        "Processed {} documents ({} failed), {} chunks stored",
        report.processed, report.failed, report.total_chunks
    );
    for error in &report.errors {
        println!("  {error}");
    }
    if report.processed == 0 && report.failed > 0 {
        bail!("no documents were ingested");
    }
    Ok(())
}

pub async fn ask(args: &GlobalArgs, ask: &AskArgs) -> anyhow::Result<()> {
    let pipeline = match ask.mode {
        ChatMode::Document => Some(Arc::new(build_pipeline(args).await?)),
        ChatMode::General => None,
    };
    let orchestrator = build_orchestrator(args, build_model(args)?, pipeline)?;
    let reply = orchestrator.respond(&ask.question, ask.mode, None).await?;

    println!("{}", reply.response);
    if !reply.metadata.sources.is_empty() {
        println!("\nSources: {}", reply.metadata.sources.join(", "));
    }
    if !reply.metadata.success {
        bail!(reply.metadata.error.unwrap_or_else(|| "model call failed".to_string()));
    }
    Ok(())
}

/// Interactive chat. Document mode is offered whenever the store opens.
pub async fn chat(args: &GlobalArgs, chat: &ChatArgs) -> anyhow::Result<()> {
    let pipeline = match build_pipeline(args).await {
        Ok(pipeline) => Some(Arc::new(pipeline)),
        Err(e) if chat.mode == ChatMode::Document => return Err(e),
        Err(e) => {
            warn!(error = %e, "document mode disabled");
            None
        }
    };
    let orchestrator = build_orchestrator(args, build_model(args)?, pipeline)?;
    repl::run(&orchestrator, chat.mode).await
}

pub async fn stats(args: &GlobalArgs) -> anyhow::Result<()> {
    let pipeline = build_pipeline(args).await?;
    let stats = pipeline.collection_stats().await;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

pub async fn clear(args: &GlobalArgs) -> anyhow::Result<()> {
    build_pipeline(args).await?.clear_all().await?;
    println!("All documents cleared successfully");
    Ok(())
}

pub async fn models(args: &GlobalArgs) -> anyhow::Result<()> {
    let availability = build_model(args)?.availability().await;
    println!("{}", serde_json::to_string_pretty(&availability)?);
    Ok(())
}

pub async fn check_connection(args: &GlobalArgs) -> anyhow::Result<()> {
    let model = build_model(args)?;
    let report = test_connection(&*model, args.profile.options()).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.success {
        bail!(report.message);
    }
    Ok(())
}
