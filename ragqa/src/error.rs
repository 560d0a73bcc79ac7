//! Error types for the `ragqa` crate.

use thiserror::Error;

/// Errors that can occur while ingesting, indexing, or answering.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation or model loading.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A source document could not be loaded.
    #[error("Failed to load '{path}': {message}")]
    LoaderError {
        /// The path or URI that was being loaded.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// The chat model request failed or returned an unusable response.
    #[error("Model error ({provider}): {message}")]
    ModelError {
        /// The model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the RAG pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
