//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the ingest-and-retrieve workflow by
//! composing an [`EmbeddingProvider`], a [`VectorStore`], and a [`Chunker`].
//!
//! # Example
//!
//! ```rust,ignore
//! use ragqa::{RagPipeline, RagConfig, InMemoryVectorStore, RecursiveChunker};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .chunker(Arc::new(RecursiveChunker::new(500, 50)))
//!     .build()?;
//!
//! pipeline.create_collection("docs").await?;
//! let chunks = pipeline.split_documents(&pages);
//! pipeline.index("docs", chunks).await?;
//! let results = pipeline.query("docs", "search query").await?;
//! ```

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::chunking::Chunker;
use crate::config::{RagConfig, SearchType};
use crate::document::{Chunk, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// The RAG pipeline orchestrator.
///
/// Coordinates document ingestion (chunk → embed → store) and retrieval
/// (embed → similarity or MMR search → filter). Construct one via
/// [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Create a named collection in the vector store.
    ///
    /// The collection is created with the dimensionality reported by the
    /// configured [`EmbeddingProvider`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the vector store operation fails.
    pub async fn create_collection(&self, name: &str) -> Result<()> {
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.create_collection(name, dimensions).await.map_err(|e| {
            error!(collection = name, error = %e, "failed to create collection");
            RagError::PipelineError(format!("failed to create collection '{name}': {e}"))
        })
    }

    /// Split documents into chunks, in document order.
    ///
    /// Chunks carry copies of their document's metadata and have no
    /// embeddings yet.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = documents.iter().flat_map(|d| self.chunker.chunk(d)).collect();
        debug!(document_count = documents.len(), chunk_count = chunks.len(), "split documents");
        chunks
    }

    /// Embed chunks in one batch and upsert them into `collection`.
    ///
    /// Returns the stored chunks with embeddings attached.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or storage fails.
    pub async fn index(&self, collection: &str, mut chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
        if chunks.is_empty() {
            info!(collection, chunk_count = 0, "nothing to index");
            return Ok(chunks);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(collection, error = %e, "embedding failed during indexing");
            RagError::PipelineError(format!("embedding failed: {e}"))
        })?;

        if embeddings.len() != chunks.len() {
            return Err(RagError::PipelineError(format!(
                "embedding provider returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        self.vector_store.upsert(collection, &chunks).await.map_err(|e| {
            error!(collection, error = %e, "upsert failed during indexing");
            RagError::PipelineError(format!("upsert failed in collection '{collection}': {e}"))
        })?;

        info!(collection, chunk_count = chunks.len(), "indexed chunks");
        Ok(chunks)
    }

    /// Ingest a single document: chunk → embed → store.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or storage fails,
    /// including the document ID in the error message.
    pub async fn ingest(&self, collection: &str, document: &Document) -> Result<Vec<Chunk>> {
        let chunks = self.chunker.chunk(document);
        self.index(collection, chunks).await.map_err(|e| {
            RagError::PipelineError(format!("ingestion failed for document '{}': {e}", document.id))
        })
    }

    /// Ingest multiple documents through the chunk → embed → store workflow.
    ///
    /// Returns all chunks that were stored across all documents.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] on the first document that fails.
    pub async fn ingest_batch(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> Result<Vec<Chunk>> {
        let mut all_chunks = Vec::new();
        for document in documents {
            let chunks = self.ingest(collection, document).await?;
            all_chunks.extend(chunks);
        }
        Ok(all_chunks)
    }

    /// Query the pipeline: embed → search → filter by the optional threshold.
    ///
    /// With [`SearchType::Similarity`] results are ordered by descending
    /// score; with [`SearchType::Mmr`] they are in MMR selection order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or search fails.
    pub async fn query(&self, collection: &str, query: &str) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            RagError::PipelineError(format!("query embedding failed: {e}"))
        })?;

        let config = &self.config;
        let results = match config.search_type {
            SearchType::Similarity => {
                self.vector_store.search(collection, &query_embedding, config.top_k).await
            }
            SearchType::Mmr => {
                self.vector_store
                    .mmr_search(
                        collection,
                        &query_embedding,
                        config.top_k,
                        config.fetch_k,
                        config.lambda_mult,
                    )
                    .await
            }
        }
        .map_err(|e| {
            error!(collection, error = %e, "vector store search failed");
            RagError::PipelineError(format!("search failed in collection '{collection}': {e}"))
        })?;

        let filtered: Vec<SearchResult> = match config.similarity_threshold {
            Some(threshold) => results.into_iter().filter(|r| r.score >= threshold).collect(),
            None => results,
        };

        info!(search_type = ?config.search_type, result_count = filtered.len(), "query completed");

        Ok(filtered)
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// All fields are required except `config`, which falls back to
/// [`RagConfig::default()`]. Call [`build()`](RagPipelineBuilder::build)
/// to validate and produce the pipeline.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker =
            self.chunker.ok_or_else(|| RagError::ConfigError("chunker is required".to_string()))?;

        Ok(RagPipeline { config, embedding_provider, vector_store, chunker })
    }
}
