//! Keyword search over the metadata index.
//!
//! Search is a linear scan: every record whose kind passes the filter and
//! whose searchable text contains the query (case-insensitively) is a hit.
//! There is no ranking; hits come back in index order. The empty query is a
//! substring of every text and therefore matches every record.
//!
//! Positions are counted in characters. Case folding uses full Unicode
//! lower-casing and maps match positions back onto the original text, so a
//! snippet is always cut from the text as stored.

use tracing::debug;

use crate::domain::{FileKind, FileRecord, SearchResult};
use crate::library::MetadataIndex;

use super::validation::ValidationError;

/// Marker added where a snippet was cut
pub const ELLIPSIS: &str = "...";

/// Which kinds a query covers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KindFilter {
    /// `None` means every kind
    kinds: Option<Vec<FileKind>>,
}

impl KindFilter {
    pub fn all() -> Self {
        Self { kinds: None }
    }

    pub fn only(kinds: impl IntoIterator<Item = FileKind>) -> Self {
        let mut list: Vec<FileKind> = Vec::new();
        for kind in kinds {
            if !list.contains(&kind) {
                list.push(kind);
            }
        }
        Self { kinds: Some(list) }
    }

    /// Parse a comma-separated list such as `"document, audio"`.
    ///
    /// Blank segments are ignored; a blank list means every kind.
    pub fn parse(list: &str) -> Result<Self, ValidationError> {
        let mut kinds = Vec::new();
        for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let kind = part
                .parse::<FileKind>()
                .map_err(|_| ValidationError::UnknownKind(part.to_string()))?;
            kinds.push(kind);
        }

        if kinds.is_empty() {
            Ok(Self::all())
        } else {
            Ok(Self::only(kinds))
        }
    }

    pub fn allows(&self, kind: FileKind) -> bool {
        match &self.kinds {
            Some(kinds) => kinds.contains(&kind),
            None => true,
        }
    }
}

/// Scans the index and cuts snippets
#[derive(Debug, Clone, Copy)]
pub struct SearchEngine {
    snippet_context: usize,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(100)
    }
}

impl SearchEngine {
    pub fn new(snippet_context: usize) -> Self {
        Self { snippet_context }
    }

    /// Search the current contents of `index`
    pub async fn search(
        &self,
        index: &MetadataIndex,
        query: &str,
        filter: &KindFilter,
    ) -> Vec<SearchResult> {
        let records = index.snapshot().await;
        let results = self.scan(&records, query, filter);
        debug!(query, scanned = records.len(), hits = results.len(), "Search complete");
        results
    }

    /// Search an in-memory slice of records
    pub fn scan(&self, records: &[FileRecord], query: &str, filter: &KindFilter) -> Vec<SearchResult> {
        records
            .iter()
            .filter(|record| filter.allows(record.kind()))
            .filter_map(|record| {
                let text = record.searchable_text();
                find_case_insensitive(text, query)?;
                Some(SearchResult {
                    file_hash: record.file_hash.clone(),
                    filename: record.filename.clone(),
                    file_type: record.kind(),
                    relevance_snippet: snippet(text, query, self.snippet_context),
                    metadata: record.clone(),
                })
            })
            .collect()
    }
}

/// Case-folded text with each folded char's source position
struct Folded {
    chars: Vec<char>,
    origin: Vec<usize>,
}

fn fold(text: &str) -> Folded {
    let mut chars = Vec::with_capacity(text.len());
    let mut origin = Vec::with_capacity(text.len());
    for (i, c) in text.chars().enumerate() {
        for lower in c.to_lowercase() {
            chars.push(lower);
            origin.push(i);
        }
    }
    Folded { chars, origin }
}

/// First case-insensitive occurrence of `query` in `text`, as a half-open
/// range of character positions in `text`.
pub fn find_case_insensitive(text: &str, query: &str) -> Option<(usize, usize)> {
    let needle: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return Some((0, 0));
    }

    let haystack = fold(text);
    if needle.len() > haystack.chars.len() {
        return None;
    }

    let pos = haystack
        .chars
        .windows(needle.len())
        .position(|window| window == needle.as_slice())?;

    let start = haystack.origin[pos];
    let end = haystack.origin[pos + needle.len() - 1] + 1;
    Some((start, end))
}

/// Excerpt of `text` around the first match of `query`.
///
/// Without a match this is the first `context_size` characters followed by
/// an ellipsis. With a match it is the match plus up to `context_size / 2`
/// characters on each side, with an ellipsis on each side that was cut.
pub fn snippet(text: &str, query: &str, context_size: usize) -> String {
    let chars: Vec<char> = text.chars().collect();

    let Some((match_start, match_end)) = find_case_insensitive(text, query) else {
        let head: String = chars.iter().take(context_size).collect();
        return format!("{}{}", head, ELLIPSIS);
    };

    let half = context_size / 2;
    let start = match_start.saturating_sub(half);
    let end = (match_end + half).min(chars.len());

    let mut out = String::new();
    if start > 0 {
        out.push_str(ELLIPSIS);
    }
    out.extend(&chars[start..end]);
    if end < chars.len() {
        out.push_str(ELLIPSIS);
    }
    out
}
