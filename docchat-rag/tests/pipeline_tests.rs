//! End-to-end tests for the retrieval pipeline with the hashing embedder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use docchat_rag::{
    EmbeddingProvider, HashingEmbeddingProvider, InMemoryVectorStore, IngestReport, RagConfig,
    RagError, RetrievalPipeline, Retriever, VectorStore,
};

fn filler(len: usize) -> String {
    "lorem ipsum dolor sit amet ".chars().cycle().take(len).collect()
}

/// 3000 chars whose only mention of "zebra quantum marmalade" sits in
/// [1800, 2400), a span covered solely by the third 1000/200 window.
fn three_thousand_chars() -> String {
    let mut text = filler(1799);
    text.push(' ');
    text.extend("zebra quantum marmalade ".chars().cycle().take(599));
    text.push(' ');
    text.push_str(&filler(600));
    assert_eq!(text.chars().count(), 3000);
    text
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

async fn pipeline_with(store: Arc<InMemoryVectorStore>) -> RetrievalPipeline {
    let pipeline = RetrievalPipeline::builder()
        .config(RagConfig::default())
        .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
        .vector_store(store)
        .build()
        .unwrap();
    pipeline.initialize().await.unwrap();
    pipeline
}

async fn pipeline() -> RetrievalPipeline {
    pipeline_with(Arc::new(InMemoryVectorStore::new())).await
}

#[tokio::test]
async fn ingest_then_search_finds_the_right_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "animals.txt", &three_thousand_chars());
    let pipeline = pipeline().await;

    let report = pipeline.ingest_files(&[file.clone()]).await;
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.total_chunks, 4);
    assert!(report.errors.is_empty());

    let results = pipeline.search("zebra quantum marmalade", 5).await;
    assert_eq!(results.len(), 4);
    let top = &results[0];
    assert_eq!(top.rank, 1);
    assert_eq!(top.chunk.chunk_index, 2);
    assert_eq!(top.chunk.chunk_count, 4);
    assert_eq!(top.chunk.source_file, "animals.txt");
    assert_eq!(top.chunk.file_path, file.display().to_string());
    assert!(top.similarity_score > results[1].similarity_score);
}

#[tokio::test]
async fn ranks_are_consecutive_and_scores_bounded() {
    let pipeline = pipeline().await;
    pipeline.ingest_text("a.txt", &filler(2500)).await.unwrap();
    pipeline.ingest_text("b.txt", "the quick brown fox jumps over the lazy dog").await.unwrap();

    let results = pipeline.search("quick fox", 10).await;
    assert!(!results.is_empty() && results.len() <= 10);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.rank, i + 1);
        assert!((-1.0..=1.0).contains(&result.similarity_score));
    }
    for pair in results.windows(2) {
        assert!(pair[0].similarity_score >= pair[1].similarity_score);
    }
    assert_eq!(results[0].chunk.source_file, "b.txt");
}

#[tokio::test]
async fn k_limits_result_count() {
    let pipeline = pipeline().await;
    pipeline.ingest_text("long.txt", &filler(5000)).await.unwrap();
    assert_eq!(pipeline.search("lorem", 2).await.len(), 2);
}

#[tokio::test]
async fn reingesting_a_file_duplicates_its_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "twice.txt", &filler(2500));
    let pipeline = pipeline().await;

    let first = pipeline.ingest_files(&[file.clone()]).await;
    let second = pipeline.ingest_files(&[file]).await;
    assert_eq!(first.total_chunks, 3);
    assert_eq!(second.total_chunks, 3);
    assert_eq!(pipeline.collection_stats().await.total_chunks, 6);

    let results = pipeline.search("lorem ipsum", 6).await;
    let mut ids: Vec<_> = results.iter().map(|r| r.chunk.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 6);
}

#[tokio::test]
async fn failures_are_reported_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let good = write(dir.path(), "good.txt", "Rust is a systems programming language.");
    let blank = write(dir.path(), "blank.txt", "   \n\n  ");
    let slides = write(dir.path(), "deck.pptx", "not really slides");
    let missing = dir.path().join("gone.txt");
    let pipeline = pipeline().await;

    let report = pipeline.ingest_files(&[good, blank.clone(), slides, missing]).await;
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 3);
    assert_eq!(report.total_chunks, 1);
    assert_eq!(report.errors.len(), 3);
    assert_eq!(report.errors[0], format!("No text extracted from {}", blank.display()));
    assert!(report.errors[1].starts_with("Error processing"));
    assert!(report.errors[1].contains("Unsupported format: .pptx"));
    assert!(report.errors[2].contains("gone.txt"));
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let pipeline = pipeline().await;
    let report = pipeline.ingest_files(&[]).await;
    assert_eq!(report, IngestReport::default());
}

#[tokio::test]
async fn clear_all_empties_the_collection() {
    let pipeline = pipeline().await;
    pipeline.ingest_text("notes.txt", &filler(1800)).await.unwrap();
    assert!(pipeline.collection_stats().await.total_chunks > 0);

    pipeline.clear_all().await.unwrap();
    assert_eq!(pipeline.collection_stats().await.total_chunks, 0);
    assert!(pipeline.search("lorem", 5).await.is_empty());

    // idempotent
    pipeline.clear_all().await.unwrap();
    assert_eq!(pipeline.collection_stats().await.total_chunks, 0);
}

#[tokio::test]
async fn stats_describe_the_collection() {
    let pipeline = pipeline().await;
    pipeline.ingest_text("notes.txt", "short note").await.unwrap();

    let stats = pipeline.collection_stats().await;
    assert_eq!(stats.total_chunks, 1);
    assert_eq!(stats.collection_name, "document_embeddings");
    assert_eq!(stats.embedding_model, "hashing-bow");
    assert!(stats.error.is_none());
}

#[tokio::test]
async fn uninitialized_collection_degrades_gracefully() {
    let pipeline = RetrievalPipeline::builder()
        .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .build()
        .unwrap();

    assert!(pipeline.search("anything", 5).await.is_empty());
    assert!(pipeline.try_search("anything", 5).await.is_err());

    let stats = pipeline.collection_stats().await;
    assert_eq!(stats.total_chunks, 0);
    assert!(stats.error.is_some());
}

#[tokio::test]
async fn persisted_chunks_are_searchable_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("store.json");
    {
        let store = Arc::new(InMemoryVectorStore::persistent(&snapshot).unwrap());
        let pipeline = pipeline_with(store).await;
        pipeline.ingest_text("kept.txt", "persistent penguins").await.unwrap();
    }

    let store = Arc::new(InMemoryVectorStore::persistent(&snapshot).unwrap());
    let pipeline = pipeline_with(store).await;
    let results = pipeline.search("penguins", 1).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.source_file, "kept.txt");
}

#[tokio::test]
async fn reopening_with_a_different_embedder_width_fails_initialize() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("store.json");
    {
        let store = Arc::new(InMemoryVectorStore::persistent(&snapshot).unwrap());
        let pipeline = pipeline_with(store).await;
        pipeline.ingest_text("kept.txt", "persistent penguins").await.unwrap();
    }

    let store = Arc::new(InMemoryVectorStore::persistent(&snapshot).unwrap());
    let pipeline = RetrievalPipeline::builder()
        .embedding_provider(Arc::new(HashingEmbeddingProvider::new(16).unwrap()))
        .vector_store(store.clone())
        .build()
        .unwrap();
    let err = pipeline.initialize().await.unwrap_err();
    assert!(matches!(err, RagError::PipelineError(_)), "got {err:?}");
    assert!(err.to_string().contains("384-dimensional"));
    assert_eq!(store.count(docchat_rag::DEFAULT_COLLECTION).await.unwrap(), 1);
}

#[tokio::test]
async fn retriever_trait_delegates_to_search() {
    let pipeline = pipeline().await;
    pipeline.ingest_text("a.txt", "retrieval through a trait object").await.unwrap();

    let retriever: Arc<dyn Retriever> = Arc::new(pipeline);
    let results = retriever.search("trait object", 3).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].rank, 1);
}

struct BrokenEmbedder;

#[async_trait]
impl EmbeddingProvider for BrokenEmbedder {
    async fn embed(&self, _text: &str) -> docchat_rag::Result<Vec<f32>> {
        Err(RagError::EmbeddingError {
            provider: "broken".to_string(),
            message: "model not loaded".to_string(),
        })
    }

    fn dimensions(&self) -> usize {
        8
    }

    fn model_name(&self) -> &str {
        "broken"
    }
}

#[tokio::test]
async fn embedder_failures_surface_in_report_and_empty_search() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "doc.txt", "some content");
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = RetrievalPipeline::builder()
        .embedding_provider(Arc::new(BrokenEmbedder))
        .vector_store(store.clone())
        .build()
        .unwrap();
    pipeline.initialize().await.unwrap();

    let report = pipeline.ingest_files(&[file]).await;
    assert_eq!(report.failed, 1);
    assert!(report.errors[0].contains("model not loaded"));
    assert_eq!(store.count("document_embeddings").await.unwrap(), 0);

    assert!(pipeline.search("content", 5).await.is_empty());
}

#[test]
fn builder_requires_embedder_and_store() {
    let err = RetrievalPipeline::builder()
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .build()
        .err()
        .unwrap();
    assert!(err.to_string().contains("embedding_provider is required"));

    let err = RetrievalPipeline::builder()
        .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
        .build()
        .err()
        .unwrap();
    assert!(err.to_string().contains("vector_store is required"));
}
