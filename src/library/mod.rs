//! Durable state: raw blobs and the metadata index.
//!
//! # Storage Layout
//!
//! ```text
//! <root>/
//! ├── metadata.json             # hash → full record (system of record)
//! ├── documents/<hash><ext>     # raw document bytes
//! ├── videos/<hash><ext>        # raw video bytes
//! ├── audio/<hash><ext>         # raw audio bytes
//! └── embeddings/               # reserved, never populated
//! ```

pub mod catalog;
pub mod content;

pub use catalog::{IndexError, MetadataIndex};
pub use content::{file_extension, ContentStore, StoreError, StoredBlob};
