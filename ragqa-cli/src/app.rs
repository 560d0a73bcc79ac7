//! The five-stage run: configure, ingest, index, answer, report.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use ragqa::{
    ChatModel, DocumentLoader, EmbeddingProvider, InMemoryVectorStore, QaResult, RagConfig,
    RagPipeline, RecursiveChunker, RetrievalQa, SearchType, source_pages,
};
use ragqa_tracking::{ExperimentTracker, RunInfo};
use tracing::info;

use crate::embedder::LazyEmbedder;
use crate::settings::Settings;

pub const CHUNK_SIZE: usize = 500;
pub const CHUNK_OVERLAP: usize = 50;
pub const RETRIEVAL_K: usize = 5;
pub const EXPERIMENT_NAME: &str = "rag-qa-pipeline";
pub const ANSWER_ARTIFACT: &str = "output_answer.txt";

const COLLECTION: &str = "pdf";

/// The external seams of a run.
pub struct Components {
    /// Turns the PDF path into one document per page.
    pub loader: Arc<dyn DocumentLoader>,
    /// Embeds chunks and the question; its model name is logged with the run.
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Answers from the retrieved context; its name is logged with the run.
    pub model: Arc<dyn ChatModel>,
    /// Opens one tracking run per completed question.
    pub tracker: ExperimentTracker,
}

impl Components {
    /// Production wiring: PDF loader, local MiniLM embeddings, OpenAI chat,
    /// and the tracking backend named by the settings.
    ///
    /// The embedding model is downloaded and loaded on first use, after the
    /// PDF has been read and chunked.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let model_dir = settings.model_dir.clone();
        let embedder = LazyEmbedder::new(
            ragqa::ALL_MINILM_L6_V2,
            ragqa::ALL_MINILM_L6_V2_DIMENSIONS,
            move || {
                let model_dir = model_dir.clone();
                async move {
                    ragqa::OnnxEmbeddingProvider::all_minilm_l6_v2(model_dir)
                        .await
                        .map(|provider| Arc::new(provider) as Arc<dyn EmbeddingProvider>)
                }
            },
        );

        let mut model = ragqa::OpenAIChatModel::new(settings.openai_api_key.clone())
            .context("failed to configure the chat model")?;
        if let Some(base_url) = &settings.openai_base_url {
            model = model.with_base_url(base_url.clone());
        }

        let store = settings.tracking_uri.open(settings.tracking_credentials.clone());
        info!(tracking_uri = %settings.tracking_uri, "tracking backend selected");

        Ok(Self {
            loader: Arc::new(ragqa::PdfLoader::new()),
            embedder: Arc::new(embedder),
            model: Arc::new(model),
            tracker: ExperimentTracker::new(store, EXPERIMENT_NAME),
        })
    }
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// Chunks produced from the PDF and indexed.
    pub chunk_count: usize,
    /// The model's answer and the chunks it was given.
    pub result: QaResult,
    /// Distinct source pages, ascending, as printed.
    pub pages: Vec<u32>,
    /// The finished tracking run.
    pub run: RunInfo,
}

/// Pipeline configuration used for every run.
pub fn rag_config() -> anyhow::Result<RagConfig> {
    RagConfig::builder()
        .chunk_size(CHUNK_SIZE)
        .chunk_overlap(CHUNK_OVERLAP)
        .top_k(RETRIEVAL_K)
        .search_type(SearchType::Mmr)
        .build()
        .context("invalid pipeline configuration")
}

/// Run ingestion through reporting for one PDF and one question.
///
/// `ask_question` is called after the document is indexed. Program output
/// goes to `out`; the tracking run is written after the answer is printed.
pub async fn execute<W, Q>(
    components: &Components,
    pdf_path: &Path,
    ask_question: Q,
    out: &mut W,
) -> anyhow::Result<RunOutcome>
where
    W: Write,
    Q: FnOnce() -> anyhow::Result<String>,
{
    let config = rag_config()?;

    // Ingestion
    let documents = components
        .loader
        .load(pdf_path)
        .await
        .with_context(|| format!("failed to load '{}'", pdf_path.display()))?;

    let pipeline = Arc::new(
        RagPipeline::builder()
            .config(config.clone())
            .embedding_provider(Arc::clone(&components.embedder))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .chunker(Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap)))
            .build()?,
    );
    let chunks = pipeline.split_documents(&documents);
    let chunk_count = chunks.len();
    writeln!(out, "Loaded {chunk_count} chunks")?;
    info!(page_count = documents.len(), chunk_count, "ingested document");

    // Indexing
    pipeline.create_collection(COLLECTION).await.context("failed to create the index")?;
    pipeline.index(COLLECTION, chunks).await.context("failed to index chunks")?;

    // Query
    let question = ask_question()?;
    let chain = RetrievalQa::new(Arc::clone(&pipeline), Arc::clone(&components.model), COLLECTION);
    let result = chain.invoke(&question).await.context("failed to answer the question")?;

    // Reporting
    writeln!(out, "Answer: {}", result.answer)?;
    let pages = source_pages(&result.source_documents);
    if !result.source_documents.is_empty() {
        writeln!(out, "Answer derived from PDF page(s): {pages:?}")?;
    }
    out.flush()?;

    let run = record_run(components, &question, &result.answer)
        .await
        .context("failed to log the tracking run")?;

    Ok(RunOutcome { chunk_count, result, pages, run })
}

/// Log the run parameters and answer as one tracking run.
async fn record_run(
    components: &Components,
    question: &str,
    answer: &str,
) -> ragqa_tracking::Result<RunInfo> {
    let run = components.tracker.start_run().await?;
    run.log_params([
        ("chunk_size", CHUNK_SIZE.to_string()),
        ("retrieval_k", RETRIEVAL_K.to_string()),
        ("embedding_model", components.embedder.model_name().to_string()),
        ("llm", components.model.name().to_string()),
        ("query", question.to_string()),
    ])
    .await?;
    run.log_text(answer, ANSWER_ARTIFACT).await?;
    run.finish().await
}
