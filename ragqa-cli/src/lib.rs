//! Command-line front end for PDF question answering.
//!
//! The binary reads its settings, asks for a PDF and a question, prints the
//! grounded answer with its source pages, and records the run for
//! experiment tracking. The pieces live here so the whole flow can run in
//! tests with in-memory components.

pub mod app;
pub mod cli;
pub mod embedder;
pub mod input;
pub mod settings;
pub mod telemetry;

pub use app::{Components, RunOutcome, execute};
pub use cli::Args;
pub use embedder::LazyEmbedder;
pub use settings::{Settings, SettingsError};
