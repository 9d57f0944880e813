//! The ingestion and retrieval engine.
//!
//! Coordinates validation, blob storage, extraction, chunking and the
//! metadata index. An [`Engine`] is constructed once at startup and passed
//! around by reference; it owns the index and is the only thing that mutates
//! it.

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::{ResolvedConfig, StorageLayout};
use crate::domain::{
    take_chars, ContentHash, FileKind, FileListing, FileRecord, IngestReceipt, RecordDetails,
    SearchResponse,
};
use crate::ingest::{Capabilities, Extractors, TextChunker};
use crate::library::{ContentStore, IndexError, MetadataIndex, StoreError};

use super::search::{KindFilter, SearchEngine};
use super::validation::{UploadPolicy, ValidationError};

/// Everything that can go wrong in an engine call
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl EngineError {
    /// Whether the caller sent a bad request (as opposed to a storage failure)
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }
}

/// Main ingestion / search engine
pub struct Engine {
    config: ResolvedConfig,
    store: ContentStore,
    index: MetadataIndex,
    extractors: Extractors,
    chunker: TextChunker,
    search: SearchEngine,
    policy: UploadPolicy,
}

impl Engine {
    /// Open the data root, detecting extractor capabilities from `config`
    pub async fn open(config: ResolvedConfig) -> Result<Self, EngineError> {
        let extractors = Extractors::detect(&config.extraction);
        Self::with_extractors(config, extractors).await
    }

    /// Open the data root with an explicit extractor set
    #[instrument(skip(config, extractors), fields(root = %config.root.display()))]
    pub async fn with_extractors(
        config: ResolvedConfig,
        extractors: Extractors,
    ) -> Result<Self, EngineError> {
        let store = ContentStore::new(config.layout());
        store.ensure_layout().await?;

        let index = MetadataIndex::open(store.layout()).await?;

        info!(files = index.len().await, "Engine ready");

        Ok(Self {
            chunker: TextChunker::new(config.indexing.chunk_size),
            search: SearchEngine::new(config.indexing.snippet_context),
            policy: UploadPolicy::new(config.max_upload_bytes),
            config,
            store,
            index,
            extractors,
        })
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn layout(&self) -> &StorageLayout {
        self.store.layout()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.extractors.capabilities()
    }

    /// Validate, store, extract and index one upload.
    ///
    /// Identical bytes under the same kind replace the existing record.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn ingest(
        &self,
        bytes: &[u8],
        filename: &str,
        kind: FileKind,
    ) -> Result<IngestReceipt, EngineError> {
        self.policy.validate(filename, kind, bytes.len() as u64)?;

        let hash = ContentStore::digest(bytes);
        if let Some(existing) = self.index.get(&hash).await {
            if existing.kind() != kind {
                return Err(ValidationError::KindConflict {
                    hash,
                    existing: existing.kind(),
                    requested: kind,
                }
                .into());
            }
        }

        let blob = self.store.store(bytes, filename, kind).await?;

        let (details, full_text) = match kind {
            FileKind::Document => {
                let text = self
                    .extractors
                    .extract_document(bytes, &blob.extension)
                    .await;
                let details = RecordDetails::Document {
                    text_content: take_chars(&text, self.config.indexing.preview_chars),
                    full_text_length: text.chars().count(),
                    chunks: self.chunker.chunk(&text),
                };
                (details, Some(text))
            }
            FileKind::Video => {
                let media = self.extractors.extract_media(&blob.path, kind).await;
                let details = RecordDetails::Video {
                    duration: media.duration,
                    transcription: media.transcription,
                    frames_extracted: media.frames_extracted,
                };
                (details, None)
            }
            FileKind::Audio => {
                let media = self.extractors.extract_media(&blob.path, kind).await;
                let details = RecordDetails::Audio {
                    duration: media.duration,
                    transcription: media.transcription,
                    sample_rate: media.sample_rate,
                };
                (details, None)
            }
        };

        let record = FileRecord {
            file_hash: blob.hash.clone(),
            filename: filename.to_string(),
            file_extension: blob.extension.clone(),
            file_path: blob.path.clone(),
            processed_at: Some(Utc::now()),
            details,
        };

        let previous = match self.index.upsert(record.clone()).await {
            Ok(previous) => previous,
            Err(IndexError::KindConflict {
                hash,
                existing,
                requested,
            }) => {
                // Lost a race with an ingestion of the same bytes under another kind
                self.discard_blob(&blob.path).await;
                return Err(ValidationError::KindConflict {
                    hash,
                    existing,
                    requested,
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(stale) = previous.and_then(|p| self.stale_blob(&p, &record)) {
            self.discard_blob(&stale).await;
        }

        info!(hash = %record.file_hash, kind = %kind, filename, "Indexed file");
        Ok(IngestReceipt::for_record(&record, full_text.as_deref()))
    }

    pub async fn ingest_document(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> Result<IngestReceipt, EngineError> {
        self.ingest(bytes, filename, FileKind::Document).await
    }

    pub async fn ingest_video(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> Result<IngestReceipt, EngineError> {
        self.ingest(bytes, filename, FileKind::Video).await
    }

    pub async fn ingest_audio(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> Result<IngestReceipt, EngineError> {
        self.ingest(bytes, filename, FileKind::Audio).await
    }

    /// Keyword search restricted to `filter`
    pub async fn search(&self, query: &str, filter: &KindFilter) -> SearchResponse {
        let results = self.search.search(&self.index, query, filter).await;
        SearchResponse::new(query, results)
    }

    /// Keyword search with an optional comma-separated kind list
    pub async fn search_types(
        &self,
        query: &str,
        types: Option<&str>,
    ) -> Result<SearchResponse, EngineError> {
        let filter = match types {
            Some(types) => KindFilter::parse(types)?,
            None => KindFilter::all(),
        };
        Ok(self.search(query, &filter).await)
    }

    /// Every indexed file, in index order
    pub async fn list(&self) -> FileListing {
        FileListing::from(self.index.list().await)
    }

    /// Full record for a hash; `None` means not found
    pub async fn file_info(&self, hash: &ContentHash) -> Option<FileRecord> {
        self.index.get(hash).await
    }

    /// Blob left behind by `previous`, resolved against the current layout.
    ///
    /// Blob names are `<hash><ext>`, so only an extension change leaves one.
    /// The stored path may spell the root differently than this engine does.
    fn stale_blob(&self, previous: &FileRecord, current: &FileRecord) -> Option<PathBuf> {
        let name = previous.file_path.file_name()?;
        if Some(name) == current.file_path.file_name() {
            return None;
        }
        Some(self.layout().kind_dir(previous.kind()).join(name))
    }

    async fn discard_blob(&self, path: &Path) {
        if let Err(e) = self.store.remove(path).await {
            warn!(error = %e, "Failed to remove stale blob");
        }
    }
}
