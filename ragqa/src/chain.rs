//! Retrieval question-answering chain.
//!
//! [`RetrievalQa`] retrieves chunks for a question, stuffs their text into a
//! prompt, and asks a [`ChatModel`] for the answer.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::document::Chunk;
use crate::error::{RagError, Result};
use crate::llm::{ChatModel, ChatRequest};
use crate::pipeline::RagPipeline;
use crate::prompt::PromptTemplate;

/// Separator placed between retrieved chunk texts in `{context}`.
const CONTEXT_SEPARATOR: &str = "\n\n";

/// The answer to one question and the chunks it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct QaResult {
    /// The model's answer text.
    pub answer: String,
    /// Retrieved chunks, in retrieval order.
    pub source_documents: Vec<Chunk>,
}

/// A retrieve-then-generate chain over one collection.
///
/// The prompt must declare `context` and `question` variables.
pub struct RetrievalQa {
    pipeline: Arc<RagPipeline>,
    model: Arc<dyn ChatModel>,
    prompt: PromptTemplate,
    collection: String,
    temperature: f32,
}

impl RetrievalQa {
    /// Create a chain using the default question-answering prompt and temperature 0.
    pub fn new(
        pipeline: Arc<RagPipeline>,
        model: Arc<dyn ChatModel>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            pipeline,
            model,
            prompt: PromptTemplate::question_answering(),
            collection: collection.into(),
            temperature: 0.0,
        }
    }

    /// Use a custom prompt.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] unless the prompt declares exactly
    /// `context` and `question`.
    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Result<Self> {
        let mut vars: Vec<&str> = prompt.input_variables().iter().map(String::as_str).collect();
        vars.sort_unstable();
        if vars != ["context", "question"] {
            return Err(RagError::ConfigError(format!(
                "QA prompt must declare 'context' and 'question', got {vars:?}"
            )));
        }
        self.prompt = prompt;
        Ok(self)
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Answer `question` from the indexed collection.
    ///
    /// # Errors
    ///
    /// Propagates retrieval errors as [`RagError::PipelineError`] and model
    /// failures unchanged. Nothing is retried.
    pub async fn invoke(&self, question: &str) -> Result<QaResult> {
        let results = self.pipeline.query(&self.collection, question).await?;
        let source_documents: Vec<Chunk> = results.into_iter().map(|r| r.chunk).collect();

        let context = source_documents
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);
        let values = HashMap::from([("context", context.as_str()), ("question", question)]);
        let prompt = self.prompt.format(&values)?;

        let request = ChatRequest::from_prompt(prompt).with_temperature(self.temperature);
        let answer = self.model.complete(request).await.inspect_err(|e| {
            error!(model = self.model.name(), error = %e, "completion failed");
        })?;

        info!(
            model = self.model.name(),
            source_count = source_documents.len(),
            answer_len = answer.len(),
            "answered question"
        );

        Ok(QaResult { answer, source_documents })
    }
}
