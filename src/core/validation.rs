//! Upload validation.
//!
//! Every check here runs before anything is written, so a rejected upload
//! leaves no blob and no index entry behind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ContentHash, FileKind};
use crate::library::file_extension;

/// Limits applied to uploads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPolicy {
    /// Largest accepted upload in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_max_upload_bytes() -> u64 {
    512 * 1024 * 1024
} // 512MB

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl UploadPolicy {
    pub fn new(max_upload_bytes: u64) -> Self {
        Self { max_upload_bytes }
    }

    /// Check an upload and return its normalized extension
    pub fn validate(
        &self,
        filename: &str,
        kind: FileKind,
        size: u64,
    ) -> Result<String, ValidationError> {
        if filename.trim().is_empty() {
            return Err(ValidationError::MissingFilename);
        }

        let extension = file_extension(filename);
        if !kind.allowed_extensions().contains(&extension.as_str()) {
            return Err(ValidationError::UnsupportedExtension { kind, extension });
        }

        if size > self.max_upload_bytes {
            return Err(ValidationError::TooLarge {
                actual: size,
                limit: self.max_upload_bytes,
            });
        }

        Ok(extension)
    }
}

/// Rejected requests
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("No file provided")]
    MissingFilename,

    #[error("Unsupported {kind} type: {extension:?}")]
    UnsupportedExtension { kind: FileKind, extension: String },

    #[error("Upload too large: {actual} > {limit} bytes")]
    TooLarge { actual: u64, limit: u64 },

    #[error("Unknown file type: {0:?}")]
    UnknownKind(String),

    #[error("Content {hash} is already indexed as {existing}; cannot index it as {requested}")]
    KindConflict {
        hash: ContentHash,
        existing: FileKind,
        requested: FileKind,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        assert_eq!(UploadPolicy::default().max_upload_bytes, 512 * 1024 * 1024);
    }

    #[test]
    fn test_accepts_allowed_extensions() {
        let policy = UploadPolicy::default();

        assert_eq!(policy.validate("ai.txt", FileKind::Document, 16).unwrap(), ".txt");
        assert_eq!(policy.validate("Report.PDF", FileKind::Document, 1).unwrap(), ".pdf");
        assert_eq!(policy.validate("clip.mkv", FileKind::Video, 1).unwrap(), ".mkv");
        assert_eq!(policy.validate("memo.flac", FileKind::Audio, 1).unwrap(), ".flac");
    }

    #[test]
    fn test_rejects_missing_filename() {
        let result = UploadPolicy::default().validate("  ", FileKind::Document, 1);
        assert_eq!(result, Err(ValidationError::MissingFilename));
    }

    #[test]
    fn test_rejects_extension_of_other_kind() {
        let result = UploadPolicy::default().validate("song.mp3", FileKind::Document, 1);
        assert!(matches!(
            result,
            Err(ValidationError::UnsupportedExtension { kind: FileKind::Document, ref extension }) if extension == ".mp3"
        ));

        let result = UploadPolicy::default().validate("README", FileKind::Document, 1);
        assert!(matches!(result, Err(ValidationError::UnsupportedExtension { .. })));
    }

    #[test]
    fn test_rejects_oversized_upload() {
        let policy = UploadPolicy::new(10);
        assert!(policy.validate("a.txt", FileKind::Document, 10).is_ok());
        assert_eq!(
            policy.validate("a.txt", FileKind::Document, 11),
            Err(ValidationError::TooLarge { actual: 11, limit: 10 })
        );
    }
}
