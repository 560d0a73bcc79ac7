//! Source attribution for answers.

use std::collections::BTreeSet;

use crate::document::Chunk;

/// Distinct page numbers of the chunks that carry one, sorted ascending.
pub fn source_pages(chunks: &[Chunk]) -> Vec<u32> {
    chunks.iter().filter_map(Chunk::page).collect::<BTreeSet<_>>().into_iter().collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::Value;

    use super::*;

    fn chunk(page: Option<Value>) -> Chunk {
        let mut metadata = HashMap::new();
        if let Some(page) = page {
            metadata.insert("page".to_string(), page);
        }
        Chunk {
            id: "c".into(),
            text: String::new(),
            embedding: Vec::new(),
            metadata,
            document_id: "d".into(),
        }
    }

    #[test]
    fn pages_are_sorted_and_distinct() {
        let chunks = vec![
            chunk(Some(Value::from(3))),
            chunk(Some(Value::from(1))),
            chunk(Some(Value::from(3))),
            chunk(None),
            chunk(Some(Value::from(2))),
        ];
        assert_eq!(source_pages(&chunks), vec![1, 2, 3]);
    }

    #[test]
    fn chunks_without_pages_yield_nothing() {
        assert!(source_pages(&[chunk(None)]).is_empty());
        assert!(source_pages(&[]).is_empty());
    }
}
