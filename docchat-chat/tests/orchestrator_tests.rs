//! Behavioural tests for the chat orchestrator with a mock model.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use docchat_chat::{ChatError, ChatMode, ChatOrchestrator, PromptBuilder, Role};
use docchat_model::{
    DecodingOptions, HTTP_APOLOGY, MockModel, ModelError, TIMEOUT_APOLOGY, UNEXPECTED_APOLOGY,
};
use docchat_rag::{
    DocumentChunk, HashingEmbeddingProvider, InMemoryVectorStore, RetrievalPipeline,
    RetrievalResult, Retriever,
};

/// Returns canned results and counts calls.
struct ScriptedRetriever {
    results: Vec<RetrievalResult>,
    calls: AtomicUsize,
}

impl ScriptedRetriever {
    fn new(sources: &[&str]) -> Arc<Self> {
        let results = sources
            .iter()
            .enumerate()
            .map(|(i, source)| RetrievalResult {
                chunk: DocumentChunk {
                    id: format!("chunk-{i}"),
                    text: format!("content {i} from {source}"),
                    source_file: source.to_string(),
                    file_path: format!("/docs/{source}"),
                    chunk_index: i,
                    chunk_count: sources.len(),
                    created_at: Utc::now(),
                },
                similarity_score: 0.9 - i as f32 * 0.1,
                rank: i + 1,
            })
            .collect();
        Arc::new(Self { results, calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for ScriptedRetriever {
    async fn search(&self, _query: &str, k: usize) -> Vec<RetrievalResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results.iter().take(k).cloned().collect()
    }
}

fn orchestrator(
    model: Arc<MockModel>,
    retriever: Option<Arc<ScriptedRetriever>>,
) -> ChatOrchestrator {
    let mut builder = ChatOrchestrator::builder().model(model);
    if let Some(retriever) = retriever {
        builder = builder.retriever(retriever);
    }
    builder.build().unwrap()
}

#[tokio::test]
async fn general_mode_never_retrieves() {
    let model = Arc::new(MockModel::new("llama3.1:8b").with_reply("Hi!"));
    let retriever = ScriptedRetriever::new(&["a.txt"]);
    let chat = orchestrator(model.clone(), Some(retriever.clone()));

    let reply = chat.respond("hello", ChatMode::General, None).await.unwrap();
    assert_eq!(reply.response, "Hi!");
    assert_eq!(reply.mode, ChatMode::General);
    assert_eq!(reply.metadata.context_used, 0);
    assert!(reply.metadata.sources.is_empty());
    assert!(reply.metadata.success);
    assert_eq!(retriever.calls(), 0);

    let prompt = &model.calls()[0].prompt;
    assert!(!prompt.contains("Source:"));
    assert!(prompt.contains("User: hello"));
}

#[tokio::test]
async fn document_mode_grounds_prompt_and_reports_sources() {
    let model = Arc::new(MockModel::new("llama3.1:8b").with_reply("Per the docs..."));
    let retriever = ScriptedRetriever::new(&["a.pdf", "b.txt", "a.pdf"]);
    let chat = ChatOrchestrator::builder()
        .model(model.clone())
        .retriever(retriever.clone())
        .prompt_builder(PromptBuilder::detailed())
        .build()
        .unwrap();

    let reply = chat.respond("what is in them?", ChatMode::Document, None).await.unwrap();
    assert!(reply.metadata.success);
    assert_eq!(reply.metadata.context_used, 3);
    assert_eq!(reply.metadata.sources, ["a.pdf", "b.txt"]);
    assert_eq!(reply.metadata.model, "llama3.1:8b");
    assert_eq!(retriever.calls(), 1);

    let prompt = &model.calls()[0].prompt;
    assert!(prompt.contains("Source: a.pdf"));
    assert!(prompt.contains("Source: b.txt"));
    assert!(prompt.rfind("content 2").unwrap() < prompt.find("what is in them?").unwrap());
}

#[tokio::test]
async fn sources_only_name_chunks_placed_in_the_prompt() {
    let model = Arc::new(MockModel::new("m").with_reply("ok"));
    let retriever = ScriptedRetriever::new(&["a.txt", "b.txt", "c.txt", "d.txt", "e.txt"]);
    let chat = orchestrator(model.clone(), Some(retriever));

    let reply = chat.respond("summarize", ChatMode::Document, None).await.unwrap();
    assert_eq!(reply.metadata.context_used, 3);
    assert_eq!(reply.metadata.sources, ["a.txt", "b.txt", "c.txt"]);

    let prompt = &model.calls()[0].prompt;
    assert!(prompt.contains("c.txt"));
    assert!(!prompt.contains("d.txt"));
    assert!(!prompt.contains("e.txt"));
}

#[tokio::test]
async fn document_mode_without_retriever_is_unavailable() {
    let model = Arc::new(MockModel::new("m"));
    let chat = orchestrator(model.clone(), None);

    let err = chat.respond("question", ChatMode::Document, None).await.unwrap_err();
    assert!(matches!(err, ChatError::ServiceUnavailable(_)));
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn blank_query_is_rejected_before_anything_runs() {
    let model = Arc::new(MockModel::new("m"));
    let retriever = ScriptedRetriever::new(&["a.txt"]);
    let chat = orchestrator(model.clone(), Some(retriever.clone()));

    for query in ["", "   ", "\n\t"] {
        let err = chat.respond(query, ChatMode::Document, None).await.unwrap_err();
        assert_eq!(err, ChatError::EmptyQuery);
    }
    assert_eq!(model.call_count(), 0);
    assert_eq!(retriever.calls(), 0);
    assert!(chat.conversations().is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn model_timeout_becomes_an_apology() {
    let model = Arc::new(MockModel::new("m").with_delay(Duration::from_secs(600)));
    let chat = ChatOrchestrator::builder()
        .model(model)
        .options(DecodingOptions::fast().with_timeout(Duration::from_secs(2)))
        .build()
        .unwrap();

    let reply = chat.respond("slow question", ChatMode::General, None).await.unwrap();
    assert!(!reply.metadata.success);
    assert_eq!(reply.response, TIMEOUT_APOLOGY);
    assert_eq!(reply.metadata.error.as_deref(), Some("Request timed out"));
    assert!(reply.processing_time < 10.0);
}

#[tokio::test]
async fn http_and_other_failures_pick_matching_apologies() {
    let http = Arc::new(
        MockModel::new("m").with_error(ModelError::Http { status: 503, body: "busy".into() }),
    );
    let reply = orchestrator(http, None).respond("q", ChatMode::General, None).await.unwrap();
    assert_eq!(reply.response, HTTP_APOLOGY);
    assert_eq!(reply.metadata.error.as_deref(), Some("HTTP 503: busy"));

    let refused =
        Arc::new(MockModel::new("m").with_error(ModelError::Connection("refused".into())));
    let reply = orchestrator(refused, None).respond("q", ChatMode::General, None).await.unwrap();
    assert_eq!(reply.response, UNEXPECTED_APOLOGY);
    assert!(!reply.metadata.success);
}

#[tokio::test]
async fn both_turns_are_recorded_under_the_conversation() {
    let model = Arc::new(MockModel::new("m").with_reply("answer"));
    let chat = orchestrator(model, None);

    let first = chat.respond("one", ChatMode::General, Some("conv_test".into())).await.unwrap();
    chat.respond("two", ChatMode::General, Some("conv_test".into())).await.unwrap();
    assert_eq!(first.conversation_id, "conv_test");

    let history = chat.history("conv_test").await;
    let roles: Vec<_> = history.iter().map(|t| t.role).collect();
    assert_eq!(roles, [Role::User, Role::Assistant, Role::User, Role::Assistant]);
    assert_eq!(history[0].content, "one");
    assert_eq!(history[1].content, "answer");
    assert!(history[1].metadata.as_ref().unwrap().success);

    assert!(chat.clear_conversation("conv_test").await);
    assert!(chat.history("conv_test").await.is_empty());
}

#[tokio::test]
async fn failed_replies_are_recorded_too() {
    let model = Arc::new(MockModel::new("m").with_error(ModelError::Timeout));
    let chat = orchestrator(model, None);

    let reply = chat.respond("q", ChatMode::General, Some("c".into())).await.unwrap();
    let history = chat.history("c").await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, reply.response);
    assert!(!history[1].metadata.as_ref().unwrap().success);
}

#[tokio::test]
async fn missing_conversation_id_is_generated() {
    let chat = orchestrator(Arc::new(MockModel::new("m")), None);
    let reply = chat.respond("hi", ChatMode::General, None).await.unwrap();

    let suffix = reply.conversation_id.strip_prefix("conv_").unwrap();
    let (seconds, random) = suffix.split_once('_').unwrap();
    assert!(seconds.parse::<i64>().is_ok());
    assert_eq!(random.len(), 8);
    assert!(random.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(chat.history(&reply.conversation_id).await.len(), 2);
}

#[tokio::test]
async fn conversations_started_in_the_same_second_stay_apart() {
    let chat = orchestrator(Arc::new(MockModel::new("m")), None);
    let first = chat.respond("first", ChatMode::General, None).await.unwrap();
    let second = chat.respond("second", ChatMode::General, None).await.unwrap();

    assert_ne!(first.conversation_id, second.conversation_id);
    let history = chat.history(&first.conversation_id).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "first");
}

#[tokio::test]
async fn model_status_delegates_to_backend() {
    let chat = orchestrator(Arc::new(MockModel::new("llama3.1:8b").unreachable()), None);
    let status = chat.model_status().await;
    assert!(!status.available);
    assert_eq!(status.current_model, "llama3.1:8b");
}

#[tokio::test]
async fn document_mode_over_real_pipeline_cites_ingested_file() {
    let pipeline = RetrievalPipeline::builder()
        .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .build()
        .unwrap();
    pipeline.initialize().await.unwrap();
    pipeline
        .ingest_text("penguins.txt", "Emperor penguins breed during the Antarctic winter.")
        .await
        .unwrap();
    pipeline.ingest_text("volcanoes.txt", "Basaltic lava flows are runny and hot.").await.unwrap();

    let model = Arc::new(MockModel::new("m").with_reply("They breed in winter."));
    let chat = ChatOrchestrator::builder()
        .model(model.clone())
        .retriever(Arc::new(pipeline))
        .build()
        .unwrap();

    let reply =
        chat.respond("When do emperor penguins breed?", ChatMode::Document, None).await.unwrap();
    assert_eq!(reply.metadata.sources[0], "penguins.txt");
    assert_eq!(reply.metadata.context_used, 2);
    assert!(model.calls()[0].prompt.contains("Emperor penguins breed"));
}
