//! Content-addressed blob storage.
//!
//! Raw uploads are written to `<root>/<kind dir>/<hash><ext>`. Identical bytes
//! always land on the same path, so a repeated upload is a content-preserving
//! overwrite and never a second copy.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::debug;

use crate::config::StorageLayout;
use crate::domain::{ContentHash, FileKind};

/// Errors raised while touching blob storage
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write blob {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove blob {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where a blob ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub hash: ContentHash,
    pub path: PathBuf,
    /// Lower-case extension with leading dot, empty if the name has none
    pub extension: String,
}

/// Blob store over a [`StorageLayout`]
#[derive(Debug, Clone)]
pub struct ContentStore {
    layout: StorageLayout,
}

impl ContentStore {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Create the root and every layout directory (idempotent)
    pub async fn ensure_layout(&self) -> Result<(), StoreError> {
        for dir in self.layout.directories() {
            create_dir(&dir).await?;
        }
        Ok(())
    }

    /// Hash without writing anything
    pub fn digest(bytes: &[u8]) -> ContentHash {
        ContentHash::of(bytes)
    }

    /// Path a blob with this hash and extension would occupy
    pub fn blob_path(&self, kind: FileKind, hash: &ContentHash, extension: &str) -> PathBuf {
        self.layout
            .kind_dir(kind)
            .join(format!("{}{}", hash.as_str(), extension))
    }

    /// Write `bytes` under the kind's directory, overwriting any existing blob
    pub async fn store(
        &self,
        bytes: &[u8],
        filename: &str,
        kind: FileKind,
    ) -> Result<StoredBlob, StoreError> {
        let hash = Self::digest(bytes);
        let extension = file_extension(filename);

        create_dir(&self.layout.kind_dir(kind)).await?;

        let path = self.blob_path(kind, &hash, &extension);
        fs::write(&path, bytes)
            .await
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;

        debug!(%hash, path = %path.display(), bytes = bytes.len(), "Stored blob");

        Ok(StoredBlob {
            hash,
            path,
            extension,
        })
    }

    /// Remove a blob; a missing file is not an error
    pub async fn remove(&self, path: &Path) -> Result<(), StoreError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Remove {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

async fn create_dir(dir: &Path) -> Result<(), StoreError> {
    // create_dir_all already tolerates a concurrent creator
    fs::create_dir_all(dir)
        .await
        .map_err(|source| StoreError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })
}

/// Lower-case extension of a file name with its leading dot
pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}
