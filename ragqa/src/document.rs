//! Data types for documents, chunks, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata key holding the 1-based page number of a document or chunk.
pub const PAGE_KEY: &str = "page";

/// A source document containing text content and metadata.
///
/// Loaders produce one `Document` per logical unit of the source; for PDFs
/// that is one per page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, Value>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document with empty metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new(), source_uri: None }
    }

    /// Add a metadata entry, returning the updated document.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The `page` metadata value, if present and a non-negative integer.
    pub fn page(&self) -> Option<u32> {
        page_of(&self.metadata)
    }
}

/// A segment of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text. Empty until indexed.
    pub embedding: Vec<f32>,
    /// Metadata copied from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, Value>,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

impl Chunk {
    /// The `page` metadata value inherited from the parent document.
    pub fn page(&self) -> Option<u32> {
        page_of(&self.metadata)
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

fn page_of(metadata: &HashMap<String, Value>) -> Option<u32> {
    metadata.get(PAGE_KEY).and_then(Value::as_u64).and_then(|p| u32::try_from(p).ok())
}

/// Set `page = index + 1` on every document, in order.
///
/// Any existing `page` value is overwritten.
pub fn assign_page_numbers(documents: &mut [Document]) {
    for (index, document) in documents.iter_mut().enumerate() {
        document.metadata.insert(PAGE_KEY.to_string(), Value::from(index + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_one_based_pages_in_order() {
        let mut docs = vec![Document::new("a", "one"), Document::new("b", "two")];
        docs[1].metadata.insert(PAGE_KEY.into(), Value::from(0));

        assign_page_numbers(&mut docs);

        assert_eq!(docs[0].page(), Some(1));
        assert_eq!(docs[1].page(), Some(2));
    }

    #[test]
    fn page_ignores_non_integer_values() {
        let doc = Document::new("a", "text").with_metadata(PAGE_KEY, "two");
        assert_eq!(doc.page(), None);
    }
}
