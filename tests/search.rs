//! Search Integration Tests
//!
//! Kind filtering, the empty-query law and containment across modalities.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mmrag::core::{Engine, KindFilter, ValidationError};
use mmrag::domain::FileKind;
use mmrag::ingest::{ExtractError, Extractors, TranscriptResult, Transcriber};
use mmrag::ResolvedConfig;
use tempfile::TempDir;

/// Transcriber that "hears" a fixed sentence in every file
struct ScriptedTranscriber(&'static str);

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn transcribe(&self, _path: &Path) -> Result<TranscriptResult, ExtractError> {
        Ok(TranscriptResult {
            text: self.0.to_string(),
            language: "en".to_string(),
            duration_seconds: 3.5,
        })
    }
}

async fn open_engine(dir: &TempDir) -> Engine {
    let extractors = Extractors::new(Duration::from_secs(5))
        .with_transcriber(Arc::new(ScriptedTranscriber("Hello from the audio side")));
    Engine::with_extractors(ResolvedConfig::with_root(dir.path()), extractors)
        .await
        .unwrap()
}

async fn seeded(dir: &TempDir) -> Engine {
    let engine = open_engine(dir).await;
    engine
        .ingest_document(b"hello document about retrieval", "hello.txt")
        .await
        .unwrap();
    engine
        .ingest_audio(b"RIFF fake wave bytes", "greeting.wav")
        .await
        .unwrap();
    engine
        .ingest_document(b"ML and AI basics", "ai.txt")
        .await
        .unwrap();
    engine
}

#[tokio::test]
async fn test_kind_filter_restricts_results() {
    let dir = TempDir::new().unwrap();
    let engine = seeded(&dir).await;

    let all = engine.search("hello", &KindFilter::all()).await;
    assert_eq!(all.count, 2);

    let documents = engine
        .search("hello", &KindFilter::only([FileKind::Document]))
        .await;
    assert_eq!(documents.count, 1);
    assert_eq!(documents.results[0].filename, "hello.txt");
    assert_eq!(documents.results[0].file_type, FileKind::Document);

    let audio = engine.search_types("HELLO", Some("audio")).await.unwrap();
    assert_eq!(audio.count, 1);
    assert_eq!(audio.results[0].filename, "greeting.wav");
    assert_eq!(
        audio.results[0].relevance_snippet,
        "Hello from the audio side"
    );
}

#[tokio::test]
async fn test_audio_receipt_uses_transcript() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir).await;

    let receipt = engine
        .ingest_audio(b"RIFF fake wave bytes", "greeting.wav")
        .await
        .unwrap();

    assert_eq!(receipt.file_type, FileKind::Audio);
    assert_eq!(receipt.duration, Some(3.5));
    assert_eq!(
        receipt.transcription_preview.as_deref(),
        Some("Hello from the audio side")
    );
    assert_eq!(receipt.text_preview, None);
}

#[tokio::test]
async fn test_empty_query_returns_every_filtered_record() {
    let dir = TempDir::new().unwrap();
    let engine = seeded(&dir).await;

    let everything = engine.search("", &KindFilter::all()).await;
    assert_eq!(everything.count, engine.list().await.count);

    let documents = engine.search_types("", Some("document")).await.unwrap();
    let names: Vec<&str> = documents.results.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, vec!["hello.txt", "ai.txt"]);
}

#[tokio::test]
async fn test_results_contain_the_query() {
    let dir = TempDir::new().unwrap();
    let engine = seeded(&dir).await;

    for query in ["retrieval", "Ai", "SIDE", "basics"] {
        let response = engine.search(query, &KindFilter::all()).await;
        assert!(response.count > 0, "no hits for {:?}", query);
        for result in &response.results {
            let text = result.metadata.searchable_text().to_lowercase();
            assert!(text.contains(&query.to_lowercase()));
        }
    }

    assert_eq!(engine.search("quantum", &KindFilter::all()).await.count, 0);
}

#[tokio::test]
async fn test_unknown_kind_in_filter_is_rejected() {
    let dir = TempDir::new().unwrap();
    let engine = seeded(&dir).await;

    let err = engine
        .search_types("hello", Some("document,image"))
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("image"));

    assert_eq!(
        KindFilter::parse("image"),
        Err(ValidationError::UnknownKind("image".to_string()))
    );
}
