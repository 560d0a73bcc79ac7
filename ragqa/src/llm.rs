//! Chat model abstraction used to generate answers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The author of a chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that frame the conversation.
    System,
    /// The end user.
    User,
    /// The model.
    Assistant,
}

/// One message in a chat exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Who wrote the message.
    pub role: Role,
    /// The message text.
    pub content: String,
}

impl ChatMessage {
    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }
}

/// A single completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// The conversation so far.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature; `None` leaves the provider default.
    pub temperature: Option<f32>,
}

impl ChatRequest {
    /// A request consisting of one user message.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self { messages: vec![ChatMessage::user(prompt)], temperature: None }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A hosted or local chat-completion model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// The model identifier, e.g. `gpt-3.5-turbo`.
    fn name(&self) -> &str;

    /// Generate the assistant reply for `request`.
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}
