//! Translation and summarization clients.
//!
//! The pipeline only sees the [`Translator`] and [`Summarizer`] traits. Engines are built once
//! at startup and shared through `Arc`, so every implementation must tolerate concurrent calls
//! from the stage runner. The Ollama client is a stateless HTTP client; the offline adapters in
//! [`local`] hold no state at all.

pub mod local;
pub mod ollama;

use crate::config::{Config, InferenceProvider};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use local::{ExtractiveSummarizer, PassthroughTranslator};
pub use ollama::OllamaClient;

/// Errors surfaced by inference engines for a single call.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Provider was unreachable or not configured.
    #[error("Inference provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Length bounds and decoding mode passed with every summarize call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryBounds {
    /// Longest summary the engine should produce.
    pub max_length: usize,
    /// Shortest summary the engine should produce.
    pub min_length: usize,
    /// Disable sampling so identical input yields identical output.
    pub deterministic: bool,
}

impl SummaryBounds {
    /// Deterministic bounds with the given limits.
    pub const fn new(max_length: usize, min_length: usize) -> Self {
        Self {
            max_length,
            min_length,
            deterministic: true,
        }
    }
}

impl Default for SummaryBounds {
    fn default() -> Self {
        Self::new(250, 100)
    }
}

/// Translate one chunk of source-language text.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Return the target-language rendition of `text`.
    async fn translate(&self, text: &str) -> Result<String, InferenceError>;
}

/// Summarize one chunk of text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Return a shorter rendition of `text` within `bounds`.
    async fn summarize(&self, text: &str, bounds: SummaryBounds) -> Result<String, InferenceError>;
}

/// Build the translation engine selected by configuration.
pub fn build_translator(config: &Config) -> Result<Arc<dyn Translator>, InferenceError> {
    match config.inference_provider {
        InferenceProvider::Passthrough => Ok(Arc::new(PassthroughTranslator)),
        InferenceProvider::Ollama => Ok(Arc::new(OllamaClient::from_config(config)?)),
    }
}

/// Build the summarization engine selected by configuration.
pub fn build_summarizer(config: &Config) -> Result<Arc<dyn Summarizer>, InferenceError> {
    match config.inference_provider {
        InferenceProvider::Passthrough => Ok(Arc::new(ExtractiveSummarizer)),
        InferenceProvider::Ollama => Ok(Arc::new(OllamaClient::from_config(config)?)),
    }
}
