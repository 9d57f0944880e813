//! Extractor interfaces and the built-in document extractors.
//!
//! Extractors turn raw bytes into searchable text. They return errors like any
//! other fallible code; turning those errors into placeholder text is the
//! job of [`Extractors`](super::registry::Extractors), not of the extractors.

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::Event;
use thiserror::Error;

/// Maximum decompressed bytes read from `word/document.xml` (zip-bomb guard)
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extraction failures. Never surfaced to uploaders.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0}")]
    Pdf(String),

    #[error("{0}")]
    Ooxml(String),

    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("extraction task failed: {0}")]
    Task(String),
}

/// Converts document bytes to text. Runs on the blocking pool.
pub trait DocumentExtractor: Send + Sync {
    /// Short label used in placeholders and logs
    fn name(&self) -> &'static str;

    /// Lower-case extensions (with leading dot) this extractor handles
    fn extensions(&self) -> &'static [&'static str];

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Duration and audio properties of a media file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    pub duration_seconds: f64,
    pub sample_rate: Option<u32>,
}

/// Reads container metadata from a stored media file
#[async_trait]
pub trait MediaProbe: Send + Sync {
    fn name(&self) -> &str;

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ExtractError>;
}

/// Result of transcription
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptResult {
    pub text: String,
    pub language: String,
    pub duration_seconds: f64,
}

/// Speech-to-text over a stored media file
#[async_trait]
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &str;

    async fn transcribe(&self, path: &Path) -> Result<TranscriptResult, ExtractError>;
}

/// `.txt` documents
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl DocumentExtractor for PlainTextExtractor {
    fn name(&self) -> &'static str {
        "TXT"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".txt"]
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        // Invalid UTF-8 is dropped rather than rejected
        Ok(bytes.utf8_chunks().map(|chunk| chunk.valid()).collect())
    }
}

/// `.pdf` documents
#[derive(Debug, Default)]
pub struct PdfExtractor;

impl DocumentExtractor for PdfExtractor {
    fn name(&self) -> &'static str {
        "PDF"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".pdf"]
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
    }
}

/// `.docx` documents. Legacy `.doc` files are routed here too and fail to
/// open as ZIP archives.
#[derive(Debug, Default)]
pub struct DocxExtractor;

impl DocumentExtractor for DocxExtractor {
    fn name(&self) -> &'static str {
        "DOCX"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".docx", ".doc"]
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
            .map_err(|e| ExtractError::Ooxml(e.to_string()))?;

        let entry = archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractError::Ooxml(e.to_string()))?;

        let mut xml = Vec::new();
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut xml)
            .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
        if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(ExtractError::Ooxml(
                "word/document.xml exceeds size limit".to_string(),
            ));
        }

        paragraphs_from_document_xml(&xml)
    }
}

/// Collect `<w:t>` runs, one line per `<w:p>` paragraph
fn paragraphs_from_document_xml(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}
