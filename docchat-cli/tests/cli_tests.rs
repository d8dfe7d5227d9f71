use clap::Parser;
use docchat_chat::{ChatMode, PromptStyle};
use docchat_cli::cli::{AskArgs, IngestArgs};
use docchat_cli::{Cli, Command, EmbedderKind, app};
use docchat_model::DecodingProfile;
use docchat_telemetry::LogFormat;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("docchat").chain(args.iter().copied())).unwrap()
}

#[test]
fn defaults_follow_document_chat_settings() {
    let cli = parse(&["stats"]);
    let args = &cli.global;
    assert_eq!(args.chunk_size, 1000);
    assert_eq!(args.chunk_overlap, 200);
    assert_eq!(args.top_k, 5);
    assert!((args.similarity_threshold - 0.7).abs() < f32::EPSILON);
    assert_eq!(args.collection, "document_embeddings");
    assert_eq!(args.profile, DecodingProfile::Fast);
    assert_eq!(args.log_format, LogFormat::Text);
    assert!(matches!(cli.command, Command::Stats));
}

#[test]
fn global_options_are_accepted_after_the_subcommand() {
    let cli = parse(&[
        "ask",
        "what changed?",
        "--mode",
        "document",
        "--profile",
        "detailed",
        "--embedder",
        "hashing",
        "--log-format",
        "json",
    ]);
    assert_eq!(cli.global.profile, DecodingProfile::Detailed);
    assert_eq!(cli.global.embedder, EmbedderKind::Hashing);
    assert_eq!(cli.global.log_format, LogFormat::Json);
    match cli.command {
        Command::Ask(AskArgs { question, mode }) => {
            assert_eq!(question, "what changed?");
            assert_eq!(mode, ChatMode::Document);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn serve_has_sensible_defaults() {
    match parse(&["serve", "--port", "9100"]).command {
        Command::Serve(serve) => {
            assert_eq!(serve.port, 9100);
            assert_eq!(serve.max_upload_mb, 10);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn invalid_values_are_rejected() {
    assert!(Cli::try_parse_from(["docchat", "stats", "--profile", "turbo"]).is_err());
    assert!(Cli::try_parse_from(["docchat", "ask", "q", "--mode", "sideways"]).is_err());
    assert!(Cli::try_parse_from(["docchat", "ingest"]).is_err());
}

#[test]
fn profile_selects_prompt_style() {
    assert_eq!(app::prompt_style(DecodingProfile::Fast), PromptStyle::Compact);
    assert_eq!(app::prompt_style(DecodingProfile::Detailed), PromptStyle::Detailed);
}

#[test]
fn overlap_must_stay_below_chunk_size() {
    let cli = parse(&["stats", "--chunk-size", "100", "--chunk-overlap", "100"]);
    assert!(app::rag_config(&cli.global).is_err());
}

#[tokio::test]
async fn ingest_persists_to_the_store_path() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("notes.txt");
    std::fs::write(&doc, "Rust ownership rules prevent data races at compile time.").unwrap();
    let store = dir.path().join("store.json");
    let store_arg = store.to_str().unwrap();

    let cli = parse(&[
        "ingest",
        doc.to_str().unwrap(),
        "--embedder",
        "hashing",
        "--store-path",
        store_arg,
    ]);
    let Command::Ingest(ingest) = &cli.command else {
        panic!("expected ingest");
    };
    app::ingest(&cli.global, ingest).await.unwrap();
    assert!(store.exists());

    let pipeline = app::build_pipeline(&cli.global).await.unwrap();
    assert_eq!(pipeline.collection_stats().await.total_chunks, 1);
    let hits = pipeline.search("ownership data races", 3).await;
    assert_eq!(hits[0].chunk.source_file, "notes.txt");
}

#[tokio::test]
async fn ingest_fails_when_nothing_was_stored() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("store.json");
    let cli = parse(&["stats", "--embedder", "hashing", "--store-path", store.to_str().unwrap()]);

    let ingest = IngestArgs { paths: vec![dir.path().join("missing.txt")] };
    assert!(app::ingest(&cli.global, &ingest).await.is_err());
}
