//! Metadata index: the durable hash → record mapping.
//!
//! The whole mapping lives in memory and is rewritten to `metadata.json`
//! after every mutation. The rewrite goes to a temp file in the same
//! directory which is then renamed over the snapshot, so a crash mid-write
//! leaves the previous snapshot intact.
//!
//! Records keep insertion order. Replacing a record keeps its position, and
//! the snapshot is written and read back in that order.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::config::StorageLayout;
use crate::domain::{ContentHash, FileKind, FileRecord, FileSummary};

/// Errors that can occur with the metadata index
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt metadata snapshot {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Index at {0} is in use by another process")]
    Locked(PathBuf),

    #[error("Content {hash} is already indexed as {existing}, refusing to re-index as {requested}")]
    KindConflict {
        hash: ContentHash,
        existing: FileKind,
        requested: FileKind,
    },
}

impl IndexError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// In-memory index backed by an atomically rewritten JSON snapshot
pub struct MetadataIndex {
    /// Path to metadata.json
    snapshot_path: PathBuf,

    /// Records in insertion order
    records: RwLock<Vec<FileRecord>>,

    /// Advisory lock held for the lifetime of the index
    _lock: File,
}

impl MetadataIndex {
    /// Lock the root and load its snapshot
    #[instrument(skip(layout), fields(root = %layout.root().display()))]
    pub async fn open(layout: &StorageLayout) -> Result<Self, IndexError> {
        let lock = acquire_lock(&layout.lock_path())?;
        let snapshot_path = layout.metadata_path();
        let records = Self::load(&snapshot_path).await?;

        info!(records = records.len(), "Loaded metadata index");

        Ok(Self {
            snapshot_path,
            records: RwLock::new(records),
            _lock: lock,
        })
    }

    /// Parse a snapshot; a missing file is an empty index
    pub async fn load(path: &Path) -> Result<Vec<FileRecord>, IndexError> {
        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(IndexError::io(path, e)),
        };

        let snapshot: SnapshotIn =
            serde_json::from_slice(&content).map_err(|source| IndexError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(snapshot.0)
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Insert or replace a record and persist the full mapping.
    ///
    /// Returns the record that was replaced, if any. The in-memory state is
    /// rolled back if the snapshot cannot be written.
    #[instrument(skip(self, record), fields(hash = %record.file_hash, kind = %record.kind()))]
    pub async fn upsert(&self, record: FileRecord) -> Result<Option<FileRecord>, IndexError> {
        let mut records = self.records.write().await;

        let position = records.iter().position(|r| r.file_hash == record.file_hash);

        let previous = match position {
            Some(pos) => {
                let existing = records[pos].kind();
                let requested = record.kind();
                if existing != requested {
                    return Err(IndexError::KindConflict {
                        hash: record.file_hash,
                        existing,
                        requested,
                    });
                }
                Some(std::mem::replace(&mut records[pos], record))
            }
            None => {
                records.push(record);
                None
            }
        };

        if let Err(e) = self.persist(&records).await {
            match (position, previous) {
                (Some(pos), Some(old)) => records[pos] = old,
                _ => {
                    records.pop();
                }
            }
            return Err(e);
        }

        debug!(replaced = previous.is_some(), total = records.len(), "Upserted record");
        Ok(previous)
    }

    /// Get a record by hash
    pub async fn get(&self, hash: &ContentHash) -> Option<FileRecord> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| &r.file_hash == hash)
            .cloned()
    }

    /// Lightweight projections in index order
    pub async fn list(&self) -> Vec<FileSummary> {
        self.records
            .read()
            .await
            .iter()
            .map(FileRecord::summary)
            .collect()
    }

    /// Clone of every record in index order
    pub async fn snapshot(&self) -> Vec<FileRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn persist(&self, records: &[FileRecord]) -> Result<(), IndexError> {
        let json = serde_json::to_vec_pretty(&SnapshotOut(records))?;
        let path = self.snapshot_path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, &json))
            .await
            .map_err(|e| IndexError::io(&self.snapshot_path, std::io::Error::other(e)))?
    }
}

fn acquire_lock(path: &Path) -> Result<File, IndexError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| IndexError::io(parent, e))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|e| IndexError::io(path, e))?;

    file.try_lock_exclusive()
        .map_err(|_| IndexError::Locked(path.to_path_buf()))?;

    Ok(file)
}

/// Write to a sibling temp file, fsync, rename over `path`, then fsync the directory
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), IndexError> {
    let dir = path.parent().unwrap_or(Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| IndexError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| IndexError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| IndexError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| IndexError::io(path, e.error))?;
    sync_dir(dir)?;

    Ok(())
}

/// Flush a directory entry change (the rename) to disk
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), IndexError> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| IndexError::io(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), IndexError> {
    Ok(())
}

/// Serializes records as a JSON object keyed by hash, preserving order
struct SnapshotOut<'a>(&'a [FileRecord]);

impl Serialize for SnapshotOut<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for record in self.0 {
            map.serialize_entry(record.file_hash.as_str(), record)?;
        }
        map.end()
    }
}

/// Reads a hash-keyed JSON object back into ordered records
struct SnapshotIn(Vec<FileRecord>);

impl<'de> Deserialize<'de> for SnapshotIn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = SnapshotIn;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of content hash to file record")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SnapshotIn, A::Error> {
                let mut records: Vec<FileRecord> = Vec::with_capacity(access.size_hint().unwrap_or(0));

                while let Some((key, mut record)) = access.next_entry::<String, FileRecord>()? {
                    // The map key is authoritative
                    record.file_hash = ContentHash::from_hex(key);
                    match records.iter_mut().find(|r| r.file_hash == record.file_hash) {
                        Some(existing) => *existing = record,
                        None => records.push(record),
                    }
                }

                Ok(SnapshotIn(records))
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecordDetails;
    use tempfile::TempDir;

    fn document(text: &str, name: &str) -> FileRecord {
        FileRecord {
            file_hash: ContentHash::of(text.as_bytes()),
            filename: name.to_string(),
            file_extension: ".txt".to_string(),
            file_path: PathBuf::from(format!("documents/{}", name)),
            processed_at: None,
            details: RecordDetails::Document {
                text_content: text.to_string(),
                full_text_length: text.chars().count(),
                chunks: vec![text.to_string()],
            },
        }
    }

    async fn create_test_index() -> (MetadataIndex, TempDir) {
        let temp = TempDir::new().unwrap();
        let index = MetadataIndex::open(&StorageLayout::new(temp.path()))
            .await
            .unwrap();
        (index, temp)
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_empty() {
        let (index, _temp) = create_test_index().await;
        assert!(index.is_empty().await);
        assert!(!index.snapshot_path().exists());
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let (index, _temp) = create_test_index().await;
        let record = document("alpha", "a.txt");
        let hash = record.file_hash.clone();

        let previous = index.upsert(record.clone()).await.unwrap();

        assert!(previous.is_none());
        assert_eq!(index.len().await, 1);
        assert_eq!(index.get(&hash).await, Some(record));
        assert!(index.snapshot_path().exists());
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place() {
        let (index, _temp) = create_test_index().await;

        index.upsert(document("first", "1.txt")).await.unwrap();
        index.upsert(document("second", "2.txt")).await.unwrap();

        let previous = index
            .upsert(document("first", "renamed.txt"))
            .await
            .unwrap();

        assert_eq!(previous.map(|r| r.filename), Some("1.txt".to_string()));
        let names: Vec<String> = index.list().await.into_iter().map(|s| s.filename).collect();
        assert_eq!(names, vec!["renamed.txt", "second.txt"]);
    }

    #[tokio::test]
    async fn test_kind_conflict_is_rejected() {
        let (index, _temp) = create_test_index().await;
        let doc = document("shared bytes", "a.txt");
        index.upsert(doc.clone()).await.unwrap();

        let audio = FileRecord {
            details: RecordDetails::Audio {
                duration: 0.0,
                transcription: String::new(),
                sample_rate: 0,
            },
            ..doc.clone()
        };

        let err = index.upsert(audio).await.unwrap_err();
        assert!(matches!(err, IndexError::KindConflict { .. }));
        assert_eq!(index.get(&doc.file_hash).await, Some(doc));
    }

    #[tokio::test]
    async fn test_reload_preserves_order() {
        let temp = TempDir::new().unwrap();
        let layout = StorageLayout::new(temp.path());

        {
            let index = MetadataIndex::open(&layout).await.unwrap();
            for name in ["c", "a", "b"] {
                index.upsert(document(name, &format!("{}.txt", name))).await.unwrap();
            }
        }

        let reopened = MetadataIndex::open(&layout).await.unwrap();
        let names: Vec<String> = reopened
            .list()
            .await
            .into_iter()
            .map(|s| s.filename)
            .collect();
        assert_eq!(names, vec!["c.txt", "a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_fatal() {
        let temp = TempDir::new().unwrap();
        let layout = StorageLayout::new(temp.path());
        std::fs::write(layout.metadata_path(), b"{ not json").unwrap();

        let result = MetadataIndex::open(&layout).await;
        assert!(matches!(result, Err(IndexError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn test_second_open_is_locked() {
        let (_index, temp) = create_test_index().await;

        let result = MetadataIndex::open(&StorageLayout::new(temp.path())).await;
        assert!(matches!(result, Err(IndexError::Locked(_))));
    }

    #[test]
    fn test_write_atomic_replaces_without_leftovers() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("metadata.json");

        write_atomic(&path, b"{}").unwrap();
        write_atomic(&path, b"{\"a\": 1}").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"{\"a\": 1}");
        let entries: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("metadata.json")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_sync_dir_missing_directory_is_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("gone");
        assert!(matches!(sync_dir(&missing), Err(IndexError::Io { .. })));
    }
}
