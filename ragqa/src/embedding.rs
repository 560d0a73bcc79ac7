//! Text embedding seam.

use async_trait::async_trait;

use crate::error::Result;

/// Turns text into fixed-length vectors for similarity search.
///
/// Every vector a provider returns has exactly [`dimensions`](Self::dimensions)
/// components; collections are created with that size and reject anything else.
///
/// ```rust,ignore
/// let provider = OnnxEmbeddingProvider::all_minilm_l6_v2(None).await?;
/// let vector = provider.embed("What is the invoice total?").await?;
/// assert_eq!(vector.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, returning one vector per input in input order.
    ///
    /// Falls back to calling [`embed`](Self::embed) once per text.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider produces.
    fn dimensions(&self) -> usize;

    /// Short model name, e.g. `all-MiniLM-L6-v2`, recorded with each run.
    fn model_name(&self) -> &str;
}
