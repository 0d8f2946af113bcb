//! Digest service shared by the HTTP and CLI shells.

use crate::{
    config::Config,
    extraction::PdfExtractor,
    inference::{InferenceError, build_summarizer, build_translator},
    metrics::MetricsSnapshot,
    processing::{
        pipeline::{DigestPipeline, PipelineSettings},
        types::{DigestOutcome, PipelineError},
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Owns the pipeline and its engines for the lifetime of the process.
///
/// Build it once at startup and share it through an `Arc`. Runs are admitted one at a time;
/// concurrency lives inside a run, at the chunk level.
pub struct DigestService {
    pipeline: DigestPipeline,
    target_language: String,
    run_gate: Mutex<()>,
}

/// Abstraction over the digest pipeline used by external surfaces.
#[async_trait]
pub trait DigestApi: Send + Sync {
    /// Run the full pipeline over one uploaded PDF.
    async fn digest(&self, pdf_bytes: Vec<u8>) -> Result<DigestOutcome, PipelineError>;

    /// Language code of the produced text, used to name download artifacts.
    fn target_language(&self) -> &str;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl DigestService {
    /// Wrap an assembled pipeline.
    pub fn new(pipeline: DigestPipeline, target_language: impl Into<String>) -> Self {
        Self {
            pipeline,
            target_language: target_language.into(),
            run_gate: Mutex::new(()),
        }
    }

    /// Build the service with the engines selected by configuration.
    pub fn from_config(config: &Config) -> Result<Self, InferenceError> {
        tracing::info!(provider = ?config.inference_provider, "Initializing inference engines");
        let translator = build_translator(config)?;
        let summarizer = build_summarizer(config)?;
        let pipeline = DigestPipeline::new(
            Arc::new(PdfExtractor::new()),
            translator,
            summarizer,
            PipelineSettings::from_config(config),
        );
        tracing::info!(
            source_language = %config.source_language,
            target_language = %config.target_language,
            "Inference engines initialized"
        );
        Ok(Self::new(pipeline, config.target_language.clone()))
    }
}

#[async_trait]
impl DigestApi for DigestService {
    async fn digest(&self, pdf_bytes: Vec<u8>) -> Result<DigestOutcome, PipelineError> {
        let _guard = self.run_gate.lock().await;
        self.pipeline.run(pdf_bytes).await
    }

    fn target_language(&self) -> &str {
        &self.target_language
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.pipeline.metrics().snapshot()
    }
}
