//! Canonical on-disk layout of a data root.
//!
//! Single source of truth - build paths through [`StorageLayout`] instead of
//! joining strings by hand. External tools that read state directly depend on
//! this layout.
//!
//! ## Layout
//!
//! | Location | Owner | Purpose |
//! |----------|-------|---------|
//! | `documents/` | ContentStore | Raw document blobs (`<hash><ext>`) |
//! | `videos/` | ContentStore | Raw video blobs |
//! | `audio/` | ContentStore | Raw audio blobs |
//! | `embeddings/` | nobody | Reserved, never populated |
//! | `metadata.json` | MetadataIndex | hash → full record snapshot |
//! | `metadata.json.lock` | MetadataIndex | Advisory single-process lock |

use std::path::{Path, PathBuf};

use crate::domain::FileKind;

/// Snapshot file name under the root
pub const METADATA_FILE: &str = "metadata.json";

/// Reserved embeddings area
pub const EMBEDDINGS_DIR: &str = "embeddings";

/// Paths of one data root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Blob directory for a declared kind
    pub fn kind_dir(&self, kind: FileKind) -> PathBuf {
        self.root.join(kind.storage_dir())
    }

    pub fn embeddings_dir(&self) -> PathBuf {
        self.root.join(EMBEDDINGS_DIR)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(format!("{}.lock", METADATA_FILE))
    }

    /// Every directory the layout owns, in creation order
    pub fn directories(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = FileKind::ALL.iter().map(|k| self.kind_dir(*k)).collect();
        dirs.push(self.embeddings_dir());
        dirs
    }
}
