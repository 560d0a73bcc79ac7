//! Deferred construction of the embedding model.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use ragqa::{EmbeddingProvider, RagError};
use tokio::sync::OnceCell;
use tracing::debug;

type LoadFuture = Pin<Box<dyn Future<Output = ragqa::Result<Arc<dyn EmbeddingProvider>>> + Send>>;
type Loader = Box<dyn Fn() -> LoadFuture + Send + Sync>;

/// An [`EmbeddingProvider`] that builds the real provider on the first embed
/// call, so a bad PDF path fails before any model download.
///
/// `model_name` and `dimensions` are known up front; the loaded provider must
/// agree with them.
pub struct LazyEmbedder {
    model_name: String,
    dimensions: usize,
    load: Loader,
    inner: OnceCell<Arc<dyn EmbeddingProvider>>,
}

impl LazyEmbedder {
    pub fn new<F, Fut>(model_name: impl Into<String>, dimensions: usize, load: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ragqa::Result<Arc<dyn EmbeddingProvider>>> + Send + 'static,
    {
        Self {
            model_name: model_name.into(),
            dimensions,
            load: Box::new(move || Box::pin(load())),
            inner: OnceCell::new(),
        }
    }

    /// Whether the wrapped provider has been built yet.
    pub fn is_loaded(&self) -> bool {
        self.inner.initialized()
    }

    async fn provider(&self) -> ragqa::Result<&Arc<dyn EmbeddingProvider>> {
        self.inner
            .get_or_try_init(|| async {
                debug!(model = %self.model_name, "loading embedding model");
                let provider = (self.load)().await?;
                if provider.dimensions() != self.dimensions {
                    return Err(RagError::EmbeddingError {
                        provider: self.model_name.clone(),
                        message: format!(
                            "loaded model produces {}-dimensional vectors, expected {}",
                            provider.dimensions(),
                            self.dimensions
                        ),
                    });
                }
                Ok(provider)
            })
            .await
    }
}

#[async_trait]
impl EmbeddingProvider for LazyEmbedder {
    async fn embed(&self, text: &str) -> ragqa::Result<Vec<f32>> {
        self.provider().await?.embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> ragqa::Result<Vec<Vec<f32>>> {
        self.provider().await?.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
