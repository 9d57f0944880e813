//! Indexed file records.
//!
//! A [`FileRecord`] is the unit stored in the metadata index. Its serialized
//! form is the on-disk contract of `metadata.json`: the common fields sit at
//! the top level and the kind-specific fields are flattened beside them,
//! discriminated by `file_type`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content hash (hex SHA256 of the raw bytes)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Digest raw bytes
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Wrap an already computed hash (e.g. from a lookup request)
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into().to_lowercase())
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared kind of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Document,
    Video,
    Audio,
}

impl FileKind {
    pub const ALL: [FileKind; 3] = [FileKind::Document, FileKind::Video, FileKind::Audio];

    /// Storage subdirectory under the data root
    pub fn storage_dir(&self) -> &'static str {
        match self {
            FileKind::Document => "documents",
            FileKind::Video => "videos",
            FileKind::Audio => "audio",
        }
    }

    /// Lower-case extensions (with leading dot) accepted for this kind
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            FileKind::Document => &[".pdf", ".txt", ".docx", ".doc"],
            FileKind::Video => &[".mp4", ".avi", ".mov", ".mkv"],
            FileKind::Audio => &[".mp3", ".wav", ".m4a", ".aac", ".flac"],
        }
    }

    /// Infer the kind from an extension, if any kind accepts it
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.allowed_extensions().contains(&extension.as_str()))
    }

    /// Whether records of this kind carry a transcription
    pub fn is_media(&self) -> bool {
        matches!(self, FileKind::Video | FileKind::Audio)
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileKind::Document => write!(f, "document"),
            FileKind::Video => write!(f, "video"),
            FileKind::Audio => write!(f, "audio"),
        }
    }
}

impl std::str::FromStr for FileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "document" | "documents" | "doc" => Ok(FileKind::Document),
            "video" | "videos" => Ok(FileKind::Video),
            "audio" => Ok(FileKind::Audio),
            other => Err(other.to_string()),
        }
    }
}

/// Kind-specific part of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "file_type", rename_all = "snake_case")]
pub enum RecordDetails {
    Document {
        /// Leading slice of the extracted text; the searchable text for documents
        text_content: String,
        /// Length of the full extracted text, in characters
        full_text_length: usize,
        #[serde(default)]
        chunks: Vec<String>,
    },
    Video {
        #[serde(default)]
        duration: f64,
        transcription: String,
        #[serde(default)]
        frames_extracted: u32,
    },
    Audio {
        #[serde(default)]
        duration: f64,
        transcription: String,
        #[serde(default)]
        sample_rate: u32,
    },
}

impl RecordDetails {
    pub fn kind(&self) -> FileKind {
        match self {
            RecordDetails::Document { .. } => FileKind::Document,
            RecordDetails::Video { .. } => FileKind::Video,
            RecordDetails::Audio { .. } => FileKind::Audio,
        }
    }
}

/// A single entry in the metadata index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Primary key
    pub file_hash: ContentHash,

    /// Original upload name
    pub filename: String,

    /// Lower-case extension with leading dot
    pub file_extension: String,

    /// Where the raw bytes live
    pub file_path: PathBuf,

    /// When the file was last ingested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub details: RecordDetails,
}

impl FileRecord {
    pub fn kind(&self) -> FileKind {
        self.details.kind()
    }

    /// Text used for keyword matching: the preview for documents, the
    /// transcription for media.
    pub fn searchable_text(&self) -> &str {
        match &self.details {
            RecordDetails::Document { text_content, .. } => text_content,
            RecordDetails::Video { transcription, .. }
            | RecordDetails::Audio { transcription, .. } => transcription,
        }
    }

    /// Lightweight projection used by listings
    pub fn summary(&self) -> FileSummary {
        FileSummary {
            file_hash: self.file_hash.clone(),
            filename: self.filename.clone(),
            file_type: self.kind(),
            file_extension: self.file_extension.clone(),
        }
    }
}

/// Listing projection of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub file_hash: ContentHash,
    pub filename: String,
    pub file_type: FileKind,
    pub file_extension: String,
}
