//! Degradation Integration Tests
//!
//! Extraction problems never fail an upload: they become placeholder text
//! that is stored, indexed and searchable like any other content.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mmrag::core::{Engine, KindFilter};
use mmrag::domain::{FileKind, RecordDetails};
use mmrag::ingest::{ExtractError, Extractors, MediaInfo, MediaProbe};
use mmrag::ResolvedConfig;
use tempfile::TempDir;

async fn open_engine(dir: &TempDir, extractors: Extractors) -> Engine {
    Engine::with_extractors(ResolvedConfig::with_root(dir.path()), extractors)
        .await
        .unwrap()
}

/// Probe that never answers
struct HangingProbe;

#[async_trait]
impl MediaProbe for HangingProbe {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn probe(&self, _path: &Path) -> Result<MediaInfo, ExtractError> {
        std::future::pending().await
    }
}

/// Probe reporting a fixed stream
struct FixedProbe;

#[async_trait]
impl MediaProbe for FixedProbe {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn probe(&self, _path: &Path) -> Result<MediaInfo, ExtractError> {
        Ok(MediaInfo {
            duration_seconds: 95.0,
            sample_rate: Some(44_100),
        })
    }
}

#[tokio::test]
async fn test_media_without_tools_gets_placeholder() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir, Extractors::new(Duration::from_secs(5))).await;

    let receipt = engine.ingest_audio(b"ID3 fake mp3", "memo.mp3").await.unwrap();
    assert_eq!(receipt.status, "processed");
    assert_eq!(receipt.duration, Some(0.0));
    assert_eq!(
        receipt.transcription_preview.as_deref(),
        Some("Audio transcription requires the whisper CLI (set WHISPER_PATH)")
    );

    let video = engine.ingest_video(b"fake mp4 bytes", "clip.mp4").await.unwrap();
    assert!(video
        .transcription_preview
        .unwrap()
        .starts_with("Video transcription requires"));

    let hits = engine
        .search("whisper", &KindFilter::only([FileKind::Audio]))
        .await;
    assert_eq!(hits.count, 1);
    assert_eq!(hits.results[0].filename, "memo.mp3");
}

#[tokio::test]
async fn test_probe_fills_media_facts() {
    let dir = TempDir::new().unwrap();
    let extractors = Extractors::new(Duration::from_secs(5)).with_probe(Arc::new(FixedProbe));
    let engine = open_engine(&dir, extractors).await;

    let audio = engine.ingest_audio(b"audio bytes", "song.flac").await.unwrap();
    let video = engine.ingest_video(b"video bytes", "talk.mkv").await.unwrap();

    match engine.file_info(&audio.file_hash).await.unwrap().details {
        RecordDetails::Audio {
            duration,
            sample_rate,
            ..
        } => {
            assert_eq!(duration, 95.0);
            assert_eq!(sample_rate, 44_100);
        }
        other => panic!("expected audio details, got {:?}", other),
    }

    match engine.file_info(&video.file_hash).await.unwrap().details {
        RecordDetails::Video {
            duration,
            frames_extracted,
            ..
        } => {
            assert_eq!(duration, 95.0);
            assert_eq!(frames_extracted, 10);
        }
        other => panic!("expected video details, got {:?}", other),
    }
}

#[tokio::test]
async fn test_hung_probe_is_bounded() {
    let dir = TempDir::new().unwrap();
    let extractors =
        Extractors::new(Duration::from_millis(50)).with_probe(Arc::new(HangingProbe));
    let engine = open_engine(&dir, extractors).await;

    let receipt = engine.ingest_video(b"video bytes", "stuck.avi").await.unwrap();
    assert_eq!(receipt.duration, Some(0.0));
    assert_eq!(engine.list().await.count, 1);
}

#[tokio::test]
async fn test_broken_pdf_is_indexed_with_error_text() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir, Extractors::new(Duration::from_secs(5))).await;

    let receipt = engine
        .ingest_document(b"this is not a pdf", "broken.pdf")
        .await
        .unwrap();
    let preview = receipt.text_preview.unwrap();
    assert!(preview.starts_with("Error extracting PDF text:"), "{}", preview);

    let hits = engine.search_types("error extracting", Some("document")).await.unwrap();
    assert_eq!(hits.count, 1);
    assert_eq!(hits.results[0].filename, "broken.pdf");
}

#[tokio::test]
async fn test_legacy_doc_degrades() {
    let dir = TempDir::new().unwrap();
    let engine = open_engine(&dir, Extractors::new(Duration::from_secs(5))).await;

    let receipt = engine
        .ingest_document(b"\xD0\xCF\x11\xE0 legacy word", "old.doc")
        .await
        .unwrap();
    assert!(receipt
        .text_preview
        .unwrap()
        .starts_with("Error extracting DOCX text:"));
    assert!(receipt.chunks_count.unwrap() >= 1);
}
