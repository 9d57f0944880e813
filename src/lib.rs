//! mmrag - content-addressed multimodal ingestion and keyword retrieval
//!
//! The retrieval half of a retrieval-augmented pipeline: uploads (documents,
//! video, audio) are stored by content hash, turned into searchable text, and
//! recorded in a durable metadata index that serves keyword queries.
//!
//! # Architecture
//!
//! - Raw bytes are stored once per content hash; re-uploads overwrite in place
//! - `metadata.json` is the system of record and is rewritten atomically
//! - Extraction failures degrade to placeholder text, never to a failed upload
//!
//! # Modules
//!
//! - `config`: configuration resolution and the on-disk layout
//! - `core`: Engine, search and validation
//! - `domain`: records and response shapes
//! - `ingest`: extractors, transcription and chunking
//! - `library`: content store and metadata index
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Ingest a document (kind inferred from the extension)
//! mmrag ingest notes/ai.txt
//!
//! # Search documents and audio
//! mmrag search "hello" --types document,audio
//!
//! # Show a record
//! mmrag show <hash>
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod ingest;
pub mod library;

// Re-export main types at crate root for convenience
pub use config::{ResolvedConfig, StorageLayout};
pub use core::{Engine, EngineError, KindFilter, ValidationError};
pub use domain::{
    ContentHash, FileKind, FileListing, FileRecord, FileSummary, IngestReceipt, RecordDetails,
    SearchResponse, SearchResult,
};
pub use ingest::{chunk_text, Extractors};
pub use library::{ContentStore, MetadataIndex};
