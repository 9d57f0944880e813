//! Core engine logic.
//!
//! This module contains:
//! - Engine: validation, storage, extraction and indexing of uploads
//! - Search: linear keyword scan and snippet extraction
//! - Validation: upload policy and request errors

pub mod engine;
pub mod search;
pub mod validation;

// Re-export commonly used types
pub use engine::{Engine, EngineError};
pub use search::{find_case_insensitive, snippet, KindFilter, SearchEngine};
pub use validation::{UploadPolicy, ValidationError};
