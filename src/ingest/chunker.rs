//! Word-atomic text chunking.
//!
//! Words are accumulated greedily into a chunk as long as the joined chunk
//! (words plus single-space separators) stays within the character budget.
//! Words are never split, so a word longer than the budget becomes a chunk of
//! its own.

/// Splits document text into bounded chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    max_chunk_size: usize,
}

impl TextChunker {
    pub fn new(max_chunk_size: usize) -> Self {
        Self { max_chunk_size }
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.max_chunk_size)
    }
}

/// Split `text` on whitespace and pack the words into chunks of at most
/// `max_chunk_size` characters.
pub fn chunk_text(text: &str, max_chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    // Characters in `current`, separators included
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len > max_chunk_size {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        } else {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
