//! Retrieval-augmented question answering over PDF documents.
//!
//! This crate provides:
//! - PDF loading, one [`Document`] per page with a 1-based `page` number
//! - Recursive character chunking with guaranteed overlap
//! - Local sentence embeddings and an in-memory vector store with MMR search
//! - A retrieve-then-generate chain over a chat-completion model
//!
//! # Features
//!
//! - `pdf` (default): [`PdfLoader`] via `pdf-extract`
//! - `onnx` (default): [`OnnxEmbeddingProvider`] running `all-MiniLM-L6-v2` with `tract`
//! - `openai` (default): [`OpenAIChatModel`]
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragqa::{
//!     DocumentLoader, InMemoryVectorStore, OnnxEmbeddingProvider, OpenAIChatModel, PdfLoader,
//!     RagConfig, RagPipeline, RecursiveChunker, RetrievalQa,
//! };
//!
//! let pages = PdfLoader::new().load("invoice.pdf".as_ref()).await?;
//! let pipeline = Arc::new(
//!     RagPipeline::builder()
//!         .config(RagConfig::default())
//!         .embedding_provider(Arc::new(OnnxEmbeddingProvider::all_minilm_l6_v2(None).await?))
//!         .vector_store(Arc::new(InMemoryVectorStore::new()))
//!         .chunker(Arc::new(RecursiveChunker::new(500, 50)))
//!         .build()?,
//! );
//! pipeline.create_collection("pdf").await?;
//! pipeline.index("pdf", pipeline.split_documents(&pages)).await?;
//!
//! let chain = RetrievalQa::new(pipeline, Arc::new(OpenAIChatModel::from_env()?), "pdf");
//! let result = chain.invoke("What is the invoice total?").await?;
//! ```

pub mod chain;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod inmemory;
pub mod llm;
pub mod loader;
pub mod mmr;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod vectorstore;

#[cfg(feature = "onnx")]
pub mod onnx;
#[cfg(feature = "openai")]
pub mod openai;

pub use chain::{QaResult, RetrievalQa};
pub use chunking::{Chunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder, SearchType};
pub use document::{Chunk, Document, PAGE_KEY, SearchResult, assign_page_numbers};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use inmemory::InMemoryVectorStore;
pub use llm::{ChatMessage, ChatModel, ChatRequest, Role};
pub use loader::DocumentLoader;
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use prompt::{NOT_IN_DOCUMENT, PromptTemplate};
pub use report::source_pages;
pub use vectorstore::VectorStore;

#[cfg(feature = "onnx")]
pub use onnx::{ALL_MINILM_L6_V2, ALL_MINILM_L6_V2_DIMENSIONS, OnnxEmbeddingProvider};
#[cfg(feature = "pdf")]
pub use loader::PdfLoader;
#[cfg(feature = "openai")]
pub use openai::{GPT_35_TURBO, OpenAIChatModel};
