//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], which
//! splits text at the coarsest available boundary (paragraph, line, sentence,
//! word) and falls back to a hard character cut when no boundary fits.

use serde_json::Value;

use crate::document::{Chunk, Document};

/// Metadata key holding the chunk's position within its document.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// Metadata key holding the character offset of the chunk in its document.
pub const START_INDEX_KEY: &str = "start_index";

/// Separators tried in priority order when choosing where a chunk ends.
const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    /// Each returned chunk has an empty embedding vector.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text hierarchically: paragraphs → lines → sentences → words → characters.
///
/// Sizes are measured in characters, not bytes. Every chunk holds at most
/// `chunk_size` characters and starts at least `chunk_overlap` characters
/// before the end of its predecessor. Chunk IDs are `{document_id}_{chunk_index}`;
/// each chunk carries a copy of the document metadata plus `chunk_index` and
/// `start_index`.
///
/// # Example
///
/// ```rust,ignore
/// use ragqa::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(500, 50);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: minimum number of characters shared by consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    /// Split raw text into `(start, end)` character spans.
    pub fn split_spans(&self, text: &str) -> Vec<(usize, usize)> {
        CharText::new(text).spans(self.chunk_size, self.chunk_overlap)
    }
}

/// Text with a char-index → byte-offset table, so spans never cut a UTF-8 sequence.
struct CharText<'a> {
    text: &'a str,
    offsets: Vec<usize>,
}

impl<'a> CharText<'a> {
    fn new(text: &'a str) -> Self {
        let offsets =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        Self { text, offsets }
    }

    fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.offsets[start]..self.offsets[end]]
    }

    fn is_whitespace_at(&self, pos: usize) -> bool {
        self.slice(pos, pos + 1).chars().all(char::is_whitespace)
    }

    fn spans(&self, chunk_size: usize, chunk_overlap: usize) -> Vec<(usize, usize)> {
        let total = self.len();
        if total == 0 || chunk_size == 0 {
            return Vec::new();
        }

        let mut spans = Vec::new();
        let mut start = 0;
        loop {
            let end = self.chunk_end(start, chunk_size, chunk_overlap);
            spans.push((start, end));
            if end >= total {
                break;
            }
            start = self.next_start(start, end, chunk_overlap);
        }
        spans
    }

    /// End of the chunk beginning at `start`: the last separator in the window,
    /// by separator priority, or a hard cut at `chunk_size`.
    fn chunk_end(&self, start: usize, chunk_size: usize, chunk_overlap: usize) -> usize {
        let total = self.len();
        if total - start <= chunk_size {
            return total;
        }

        let hi = start + chunk_size;
        // A chunk no longer than the overlap would stall the next start.
        let lo = start + chunk_overlap + 1;

        for separator in SEPARATORS {
            let sep_len = separator.chars().count();
            let found = (lo..=hi)
                .rev()
                .filter(|&end| end >= start + sep_len)
                .find(|&end| self.slice(end - sep_len, end) == separator);
            if let Some(end) = found {
                return end;
            }
        }

        hi
    }

    /// Start of the chunk after `[start, end)`: `chunk_overlap` characters back
    /// from `end`, moved to the beginning of a word when one is close by.
    fn next_start(&self, start: usize, end: usize, chunk_overlap: usize) -> usize {
        if end - start <= chunk_overlap {
            return end;
        }

        let target = end - chunk_overlap;
        let floor = (start + 1).max(target.saturating_sub(chunk_overlap));
        (floor..=target)
            .rev()
            .find(|&pos| self.is_whitespace_at(pos - 1) && !self.is_whitespace_at(pos))
            .unwrap_or(target)
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }

        let text = CharText::new(&document.text);
        text.spans(self.chunk_size, self.chunk_overlap)
            .into_iter()
            .enumerate()
            .map(|(i, (start, end))| {
                let mut metadata = document.metadata.clone();
                metadata.insert(CHUNK_INDEX_KEY.to_string(), Value::from(i));
                metadata.insert(START_INDEX_KEY.to_string(), Value::from(start));
                Chunk {
                    id: format!("{}_{i}", document.id),
                    text: text.slice(start, end).to_string(),
                    embedding: Vec::new(),
                    metadata,
                    document_id: document.id.clone(),
                }
            })
            .collect()
    }
}
