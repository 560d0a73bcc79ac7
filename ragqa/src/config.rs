//! Configuration for the RAG pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// How the pipeline selects chunks for a query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// The `top_k` chunks closest to the query by cosine similarity.
    Similarity,
    /// Maximal marginal relevance over the `fetch_k` closest chunks.
    #[default]
    Mmr,
}

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks returned per query.
    pub top_k: usize,
    /// Retrieval strategy.
    pub search_type: SearchType,
    /// Candidates fetched by similarity before MMR selection.
    pub fetch_k: usize,
    /// MMR trade-off: 1.0 is pure relevance, 0.0 is pure diversity.
    pub lambda_mult: f32,
    /// Minimum similarity score for results. `None` keeps every retrieved chunk.
    pub similarity_threshold: Option<f32>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 5,
            search_type: SearchType::Mmr,
            fetch_k: 20,
            lambda_mult: 0.5,
            similarity_threshold: None,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks returned per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the retrieval strategy.
    pub fn search_type(mut self, search_type: SearchType) -> Self {
        self.config.search_type = search_type;
        self
    }

    /// Set the number of MMR candidates fetched by similarity.
    pub fn fetch_k(mut self, fetch_k: usize) -> Self {
        self.config.fetch_k = fetch_k;
        self
    }

    /// Set the MMR relevance/diversity trade-off.
    pub fn lambda_mult(mut self, lambda: f32) -> Self {
        self.config.lambda_mult = lambda;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `fetch_k < top_k`
    /// - `lambda_mult` is outside `0.0..=1.0`
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if config.fetch_k < config.top_k {
            return Err(RagError::ConfigError(format!(
                "fetch_k ({}) must be at least top_k ({})",
                config.fetch_k, config.top_k
            )));
        }
        if !(0.0..=1.0).contains(&config.lambda_mult) {
            return Err(RagError::ConfigError(format!(
                "lambda_mult ({}) must be between 0.0 and 1.0",
                config.lambda_mult
            )));
        }
        Ok(config)
    }
}
