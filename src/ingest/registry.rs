//! Extractor selection and failure degradation.
//!
//! [`Extractors`] is resolved once at startup. Which document formats are
//! handled and whether ffprobe / whisper are available is fixed at that point;
//! a missing capability becomes a fixed placeholder for every call instead of
//! a per-call failure. Every extraction is bounded by a timeout, and every
//! failure is converted to placeholder text so ingestion always completes.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::ExtractionSettings;
use crate::domain::FileKind;

use super::extract::{
    DocxExtractor, DocumentExtractor, ExtractError, MediaInfo, MediaProbe, PdfExtractor,
    PlainTextExtractor, TranscriptResult, Transcriber,
};
use super::probe::FfprobeProbe;
use super::transcriber::WhisperTranscriber;

/// Upper bound on frames reported for a video
const MAX_FRAMES: u32 = 10;

/// What extraction produced for a video or audio file
#[derive(Debug, Clone, PartialEq)]
pub struct MediaExtraction {
    /// Seconds, 0 if unknown
    pub duration: f64,
    /// Transcript or placeholder
    pub transcription: String,
    /// Video only, 0 if unknown
    pub frames_extracted: u32,
    /// Audio only, 0 if unknown
    pub sample_rate: u32,
}

/// Which capabilities were resolved
#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    pub document_extensions: Vec<String>,
    pub media_probe: Option<String>,
    pub transcriber: Option<String>,
    pub timeout_seconds: u64,
}

/// The set of extractors an engine uses
#[derive(Clone)]
pub struct Extractors {
    documents: Vec<Arc<dyn DocumentExtractor>>,
    probe: Option<Arc<dyn MediaProbe>>,
    transcriber: Option<Arc<dyn Transcriber>>,
    timeout: Duration,
}

impl Extractors {
    /// Built-in document extractors, no media tooling
    pub fn new(timeout: Duration) -> Self {
        Self {
            documents: vec![
                Arc::new(PlainTextExtractor),
                Arc::new(PdfExtractor),
                Arc::new(DocxExtractor),
            ],
            probe: None,
            transcriber: None,
            timeout,
        }
    }

    /// Built-in extractors plus whatever media tools can be found
    pub fn detect(settings: &ExtractionSettings) -> Self {
        let mut extractors = Self::new(settings.timeout());

        match locate_binary(settings.ffprobe_path.as_deref(), "ffprobe") {
            Some(path) => {
                info!(path = %path.display(), "Media probing enabled");
                extractors.probe = Some(Arc::new(FfprobeProbe::new(path)));
            }
            None => warn!("ffprobe not found; media durations will be reported as 0"),
        }

        match locate_binary(settings.whisper_path.as_deref(), "whisper") {
            Some(path) => {
                info!(path = %path.display(), model = %settings.whisper_model, "Transcription enabled");
                extractors.transcriber = Some(Arc::new(WhisperTranscriber::new(
                    path,
                    settings.whisper_model.clone(),
                )));
            }
            None => warn!("whisper not found; media will be indexed with placeholder transcriptions"),
        }

        extractors
    }

    pub fn with_document_extractor(mut self, extractor: Arc<dyn DocumentExtractor>) -> Self {
        // Later registrations win
        self.documents.insert(0, extractor);
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn MediaProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn capabilities(&self) -> Capabilities {
        let mut document_extensions: Vec<String> = self
            .documents
            .iter()
            .flat_map(|d| d.extensions().iter().map(|e| e.to_string()))
            .collect();
        document_extensions.sort();
        document_extensions.dedup();

        Capabilities {
            document_extensions,
            media_probe: self.probe.as_ref().map(|p| p.name().to_string()),
            transcriber: self.transcriber.as_ref().map(|t| t.name().to_string()),
            timeout_seconds: self.timeout.as_secs(),
        }
    }

    fn document_extractor(&self, extension: &str) -> Option<Arc<dyn DocumentExtractor>> {
        self.documents
            .iter()
            .find(|d| d.extensions().contains(&extension))
            .cloned()
    }

    /// Extract document text. Never fails: problems become placeholder text.
    pub async fn extract_document(&self, bytes: &[u8], extension: &str) -> String {
        let Some(extractor) = self.document_extractor(extension) else {
            warn!(%extension, "No extractor for document type");
            return format!("Unsupported document type: {}", extension);
        };

        let name = extractor.name();
        let owned = bytes.to_vec();
        let task = async move {
            tokio::task::spawn_blocking(move || extractor.extract(&owned))
                .await
                .map_err(|e| ExtractError::Task(e.to_string()))?
        };

        match bounded(self.timeout, task).await {
            Ok(text) => text,
            Err(e) => {
                warn!(extractor = name, error = %e, "Document extraction degraded");
                format!("Error extracting {} text: {}", name, e)
            }
        }
    }

    /// Probe and transcribe a stored media file. Never fails.
    pub async fn extract_media(&self, path: &Path, kind: FileKind) -> MediaExtraction {
        let label = match kind {
            FileKind::Video => "Video",
            _ => "Audio",
        };

        let probe = async {
            match &self.probe {
                Some(probe) => Some(bounded(self.timeout, probe.probe(path)).await),
                None => None,
            }
        };
        let transcript = async {
            match &self.transcriber {
                Some(transcriber) => Some(bounded(self.timeout, transcriber.transcribe(path)).await),
                None => None,
            }
        };
        let (probed, transcribed) = tokio::join!(probe, transcript);

        let info = match probed {
            Some(Ok(info)) => Some(info),
            Some(Err(e)) => {
                warn!(path = %path.display(), error = %e, "Media probe degraded");
                None
            }
            None => None,
        };

        let (transcription, transcript_duration) = match transcribed {
            Some(Ok(TranscriptResult {
                text,
                duration_seconds,
                ..
            })) => (text, duration_seconds),
            Some(Err(e)) => {
                warn!(path = %path.display(), error = %e, "Transcription degraded");
                (format!("Error transcribing {}: {}", label.to_lowercase(), e), 0.0)
            }
            None => (
                format!(
                    "{} transcription requires the whisper CLI (set WHISPER_PATH)",
                    label
                ),
                0.0,
            ),
        };

        let MediaInfo {
            duration_seconds,
            sample_rate,
        } = info.unwrap_or_default();
        let duration = if duration_seconds > 0.0 {
            duration_seconds
        } else {
            transcript_duration
        };

        MediaExtraction {
            duration,
            transcription,
            frames_extracted: match kind {
                FileKind::Video => (duration.max(0.0) as u32).min(MAX_FRAMES),
                _ => 0,
            },
            sample_rate: match kind {
                FileKind::Audio => sample_rate.unwrap_or(0),
                _ => 0,
            },
        }
    }
}

impl std::fmt::Debug for Extractors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractors")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, ExtractError>
where
    F: Future<Output = Result<T, ExtractError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| ExtractError::TimedOut(limit))?
}

/// Resolve a tool: an explicit path must exist, otherwise search PATH
pub fn locate_binary(explicit: Option<&Path>, name: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.is_file().then(|| path.to_path_buf());
    }

    let search_path = std::env::var_os("PATH")?;
    std::env::split_paths(&search_path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedTranscriber(&'static str);

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn transcribe(&self, _path: &Path) -> Result<TranscriptResult, ExtractError> {
            Ok(TranscriptResult {
                text: self.0.to_string(),
                language: "en".to_string(),
                duration_seconds: 42.0,
            })
        }
    }

    struct SlowTranscriber;

    #[async_trait]
    impl Transcriber for SlowTranscriber {
        fn name(&self) -> &str {
            "slow"
        }

        async fn transcribe(&self, _path: &Path) -> Result<TranscriptResult, ExtractError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            unreachable!("timeout should fire first")
        }
    }

    struct FixedProbe;

    #[async_trait]
    impl MediaProbe for FixedProbe {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn probe(&self, _path: &Path) -> Result<MediaInfo, ExtractError> {
            Ok(MediaInfo {
                duration_seconds: 3.9,
                sample_rate: Some(22_050),
            })
        }
    }

    struct ExplodingExtractor;

    impl DocumentExtractor for ExplodingExtractor {
        fn name(&self) -> &'static str {
            "TXT"
        }

        fn extensions(&self) -> &'static [&'static str] {
            &[".txt"]
        }

        fn extract(&self, _bytes: &[u8]) -> Result<String, ExtractError> {
            panic!("parser crashed")
        }
    }

    fn extractors() -> Extractors {
        Extractors::new(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_plain_text_document() {
        let text = extractors()
            .extract_document(b"ML and AI basics", ".txt")
            .await;
        assert_eq!(text, "ML and AI basics");
    }

    #[tokio::test]
    async fn test_unsupported_document_placeholder() {
        let text = extractors().extract_document(b"...", ".rtf").await;
        assert_eq!(text, "Unsupported document type: .rtf");
    }

    #[tokio::test]
    async fn test_broken_pdf_degrades() {
        let text = extractors().extract_document(b"%PDF-garbage", ".pdf").await;
        assert!(text.starts_with("Error extracting PDF text: "), "{}", text);
    }

    #[tokio::test]
    async fn test_panicking_extractor_degrades() {
        let extractors = extractors().with_document_extractor(Arc::new(ExplodingExtractor));
        let text = extractors.extract_document(b"hi", ".txt").await;
        assert!(text.starts_with("Error extracting TXT text: "), "{}", text);
    }

    #[tokio::test]
    async fn test_media_without_tools() {
        let result = extractors()
            .extract_media(Path::new("clip.mp4"), FileKind::Video)
            .await;

        assert_eq!(result.duration, 0.0);
        assert_eq!(result.frames_extracted, 0);
        assert_eq!(
            result.transcription,
            "Video transcription requires the whisper CLI (set WHISPER_PATH)"
        );
    }

    #[tokio::test]
    async fn test_media_with_tools() {
        let extractors = extractors()
            .with_probe(Arc::new(FixedProbe))
            .with_transcriber(Arc::new(FixedTranscriber("hello world")));

        let video = extractors
            .extract_media(Path::new("clip.mp4"), FileKind::Video)
            .await;
        assert_eq!(video.duration, 3.9);
        assert_eq!(video.frames_extracted, 3);
        assert_eq!(video.sample_rate, 0);
        assert_eq!(video.transcription, "hello world");

        let audio = extractors
            .extract_media(Path::new("memo.wav"), FileKind::Audio)
            .await;
        assert_eq!(audio.sample_rate, 22_050);
        assert_eq!(audio.frames_extracted, 0);
    }

    #[tokio::test]
    async fn test_transcript_duration_used_without_probe() {
        let extractors = extractors().with_transcriber(Arc::new(FixedTranscriber("long talk")));

        let video = extractors
            .extract_media(Path::new("talk.mkv"), FileKind::Video)
            .await;
        assert_eq!(video.duration, 42.0);
        assert_eq!(video.frames_extracted, 10);
    }

    #[tokio::test]
    async fn test_slow_transcriber_times_out() {
        let extractors = Extractors::new(Duration::from_millis(50))
            .with_transcriber(Arc::new(SlowTranscriber));

        let audio = extractors
            .extract_media(Path::new("memo.wav"), FileKind::Audio)
            .await;
        assert_eq!(audio.transcription, "Error transcribing audio: timed out after 50ms");
    }

    #[test]
    fn test_capabilities() {
        let caps = extractors()
            .with_transcriber(Arc::new(FixedTranscriber("x")))
            .capabilities();

        assert_eq!(caps.document_extensions, vec![".doc", ".docx", ".pdf", ".txt"]);
        assert_eq!(caps.media_probe, None);
        assert_eq!(caps.transcriber.as_deref(), Some("fixed"));
    }

    #[test]
    fn test_locate_missing_explicit_binary() {
        assert_eq!(
            locate_binary(Some(Path::new("/definitely/not/here")), "ffprobe"),
            None
        );
    }
}
