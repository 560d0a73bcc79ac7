//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency vector store
//! protected by a `tokio::sync::RwLock`. The index lives only as long as the
//! store value; nothing is persisted.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::mmr::cosine_similarity;
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

/// One named collection. Chunks keep insertion order so that equal scores
/// always rank the same way.
#[derive(Debug, Default)]
struct Collection {
    dimensions: usize,
    chunks: Vec<Chunk>,
    positions: HashMap<String, usize>,
}

impl Collection {
    fn upsert(&mut self, chunk: Chunk) {
        match self.positions.get(&chunk.id) {
            Some(&pos) => self.chunks[pos] = chunk,
            None => {
                self.positions.insert(chunk.id.clone(), self.chunks.len());
                self.chunks.push(chunk);
            }
        }
    }

    fn remove(&mut self, id: &str) {
        if self.positions.remove(id).is_some() {
            self.chunks.retain(|c| c.id != id);
            self.positions =
                self.chunks.iter().enumerate().map(|(i, c)| (c.id.clone(), i)).collect();
        }
    }
}

/// An in-memory vector store using cosine similarity for search.
///
/// # Example
///
/// ```rust,ignore
/// use ragqa::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks stored in a collection, or `None` if it does not exist.
    pub async fn len(&self, collection: &str) -> Option<usize> {
        self.collections.read().await.get(collection).map(|c| c.chunks.len())
    }
}

fn missing_collection(collection: &str) -> RagError {
    RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| Collection { dimensions, ..Collection::default() });
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;

        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != store.dimensions) {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!(
                    "chunk '{}' has {} dimensions, collection '{collection}' expects {}",
                    bad.id,
                    bad.embedding.len(),
                    store.dimensions
                ),
            });
        }

        for chunk in chunks {
            store.upsert(chunk.clone());
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        for id in ids {
            store.remove(id);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing_collection(collection))?;

        let mut scored: Vec<SearchResult> = store
            .chunks
            .iter()
            .map(|chunk| {
                let score = cosine_similarity(&chunk.embedding, embedding);
                SearchResult { chunk: chunk.clone(), score }
            })
            .collect();

        // stable sort: equal scores stay in insertion order
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}
