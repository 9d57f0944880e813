//! Domain types for the retrieval engine.
//!
//! This module contains the core data structures:
//! - Record: indexed file metadata keyed by content hash
//! - Response: receipts and result envelopes returned to callers

pub mod record;
pub mod response;

// Re-export commonly used types
pub use record::{ContentHash, FileKind, FileRecord, FileSummary, RecordDetails};
pub use response::{take_chars, FileListing, IngestReceipt, SearchResponse, SearchResult};
