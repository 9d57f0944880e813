//! Turning uploaded bytes into indexable content.
//!
//! The pieces:
//!
//! 1. **Extract**: extractor traits plus the TXT / PDF / DOCX document extractors
//! 2. **Probe / Transcriber**: ffprobe and whisper shell-outs for media
//! 3. **Registry**: capability resolution, timeouts and placeholder degradation
//! 4. **Chunker**: word-atomic splitting of document text
//!
//! # Architecture
//!
//! ```text
//! bytes ─┬─ document ─→ DocumentExtractor (blocking pool) ─→ text ─→ TextChunker
//!        └─ video/audio ─→ stored blob ─→ MediaProbe + Transcriber ─→ transcription
//! ```

pub mod chunker;
pub mod extract;
pub mod probe;
pub mod registry;
pub mod transcriber;

// Re-export key types
pub use chunker::{chunk_text, TextChunker};
pub use extract::{
    DocumentExtractor, DocxExtractor, ExtractError, MediaInfo, MediaProbe, PdfExtractor,
    PlainTextExtractor, TranscriptResult, Transcriber,
};
pub use probe::FfprobeProbe;
pub use registry::{locate_binary, Capabilities, Extractors, MediaExtraction};
pub use transcriber::WhisperTranscriber;
