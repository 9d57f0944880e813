//! Caller-facing result shapes.
//!
//! None of these are persisted; they are built per request and serialized by
//! the CLI.

use serde::{Deserialize, Serialize};

use super::record::{ContentHash, FileKind, FileRecord, FileSummary, RecordDetails};

/// Length of the preview returned to the uploader
pub const RECEIPT_PREVIEW_CHARS: usize = 200;

/// Outcome of a successful ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReceipt {
    pub file_hash: ContentHash,

    /// Always "processed"; extraction problems show up in the preview text
    pub status: String,

    #[serde(rename = "type")]
    pub file_type: FileKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_preview: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks_count: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription_preview: Option<String>,
}

impl IngestReceipt {
    /// Build the receipt for a freshly indexed record.
    ///
    /// `full_text` is the complete extracted document text; the record itself
    /// only keeps a preview of it.
    pub fn for_record(record: &FileRecord, full_text: Option<&str>) -> Self {
        let mut receipt = Self {
            file_hash: record.file_hash.clone(),
            status: "processed".to_string(),
            file_type: record.kind(),
            text_preview: None,
            chunks_count: None,
            duration: None,
            transcription_preview: None,
        };

        match &record.details {
            RecordDetails::Document {
                text_content,
                chunks,
                ..
            } => {
                let text = full_text.unwrap_or(text_content);
                receipt.text_preview = Some(take_chars(text, RECEIPT_PREVIEW_CHARS));
                receipt.chunks_count = Some(chunks.len());
            }
            RecordDetails::Video {
                duration,
                transcription,
                ..
            }
            | RecordDetails::Audio {
                duration,
                transcription,
                ..
            } => {
                receipt.duration = Some(*duration);
                receipt.transcription_preview =
                    Some(take_chars(transcription, RECEIPT_PREVIEW_CHARS));
            }
        }

        receipt
    }
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub file_hash: ContentHash,
    pub filename: String,
    pub file_type: FileKind,
    pub relevance_snippet: String,
    pub metadata: FileRecord,
}

/// Response envelope for a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub count: usize,
}

impl SearchResponse {
    pub fn new(query: impl Into<String>, results: Vec<SearchResult>) -> Self {
        let count = results.len();
        Self {
            query: query.into(),
            results,
            count,
        }
    }
}

/// Response envelope for a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListing {
    pub files: Vec<FileSummary>,
    pub count: usize,
}

impl From<Vec<FileSummary>> for FileListing {
    fn from(files: Vec<FileSummary>) -> Self {
        let count = files.len();
        Self { files, count }
    }
}

/// First `n` characters of `text` (not bytes)
pub fn take_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}
