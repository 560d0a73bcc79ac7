//! Vector index seam.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;
use crate::mmr::mmr_select;

/// Named collections of embedded [`Chunk`]s searchable by cosine similarity.
///
/// Backends implement the CRUD operations and [`search`](Self::search);
/// [`mmr_search`](Self::mmr_search) is built on top of `search` and rarely
/// needs overriding.
///
/// ```rust,ignore
/// let store = InMemoryVectorStore::new();
/// store.create_collection("pdf", 384).await?;
/// store.upsert("pdf", &chunks).await?;
/// let hits = store.mmr_search("pdf", &query, 5, 20, 0.5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create `name` for vectors of `dimensions` components. Existing
    /// collections are left untouched.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Drop a collection and everything in it.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Insert chunks, replacing any with the same id. Embeddings must be set.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Remove chunks by id. Unknown ids are ignored.
    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()>;

    /// The `top_k` chunks closest to `embedding`, best first.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Maximal marginal relevance search.
    ///
    /// Takes the `fetch_k` nearest chunks and greedily picks `top_k` of them,
    /// trading relevance against similarity to chunks already picked.
    /// Results are in pick order and keep their query similarity as `score`.
    async fn mmr_search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        fetch_k: usize,
        lambda: f32,
    ) -> Result<Vec<SearchResult>> {
        let candidates = self.search(collection, embedding, fetch_k.max(top_k)).await?;
        let vectors: Vec<&[f32]> = candidates.iter().map(|r| r.chunk.embedding.as_slice()).collect();
        let picked = mmr_select(embedding, &vectors, top_k, lambda);

        let mut slots: Vec<Option<SearchResult>> = candidates.into_iter().map(Some).collect();
        Ok(picked.into_iter().filter_map(|idx| slots[idx].take()).collect())
    }
}
