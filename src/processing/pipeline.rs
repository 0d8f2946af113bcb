//! Pipeline orchestration: extract, chunk, translate, re-chunk, summarize.
//!
//! Each run walks the stages once, in order, with no retries and no way back. Extraction
//! failures, an empty text layer, and a stage in which every chunk failed end the run; partial
//! chunk failures are carried forward as gaps in the outcome.

use super::chunking::{SplitPolicy, split_text};
use super::stage::{StageReport, StageRunner};
use super::types::{DigestOutcome, PipelineError, PipelineStage};
use crate::config::Config;
use crate::extraction::{ExtractionError, TextExtractor};
use crate::inference::{SummaryBounds, Summarizer, Translator};
use crate::metrics::RunMetrics;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

/// Delimiter placed between the outputs of consecutive chunks.
pub const STAGE_JOIN_DELIMITER: &str = "\n\n";

/// Tunables for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Chunk budget for both chunking passes.
    pub chunk_max_length: usize,
    /// Atomic unit used by both chunking passes.
    pub split_policy: SplitPolicy,
    /// Bounds passed to every summarize call.
    pub summary_bounds: SummaryBounds,
    /// Transform calls allowed in flight per stage.
    pub concurrency: usize,
    /// Per-chunk timeout, if any.
    pub chunk_timeout: Option<Duration>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_max_length: 1024,
            split_policy: SplitPolicy::Words,
            summary_bounds: SummaryBounds::default(),
            concurrency: 4,
            chunk_timeout: None,
        }
    }
}

impl PipelineSettings {
    /// Derive settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_max_length: config.chunk_max_length,
            split_policy: config.chunk_split_policy,
            summary_bounds: SummaryBounds::new(config.summary_max_length, config.summary_min_length),
            concurrency: config.stage_concurrency,
            chunk_timeout: config.chunk_timeout(),
        }
    }
}

/// Orchestrates one document from uploaded bytes to summary.
///
/// Engines are injected once and shared by every run and every chunk worker.
pub struct DigestPipeline {
    extractor: Arc<dyn TextExtractor>,
    translator: Arc<dyn Translator>,
    summarizer: Arc<dyn Summarizer>,
    settings: PipelineSettings,
    runner: StageRunner,
    metrics: Arc<RunMetrics>,
}

impl DigestPipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        translator: Arc<dyn Translator>,
        summarizer: Arc<dyn Summarizer>,
        settings: PipelineSettings,
    ) -> Self {
        let runner = StageRunner::new(settings.concurrency).with_chunk_timeout(settings.chunk_timeout);
        Self {
            extractor,
            translator,
            summarizer,
            settings,
            runner,
            metrics: Arc::new(RunMetrics::new()),
        }
    }

    /// Settings in effect for every run.
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Counters accumulated across runs.
    pub fn metrics(&self) -> &Arc<RunMetrics> {
        &self.metrics
    }

    /// Run the full pipeline over one uploaded PDF.
    pub async fn run(&self, pdf_bytes: Vec<u8>) -> Result<DigestOutcome, PipelineError> {
        let run_id = Uuid::new_v4().to_string();
        let document_sha256 = hex::encode(Sha256::digest(&pdf_bytes));
        let span = tracing::info_span!(
            "pipeline_run",
            run_id = %run_id,
            document = %&document_sha256[..12],
        );

        let result = self
            .run_stages(run_id, document_sha256, pdf_bytes)
            .instrument(span.clone())
            .await;
        span.in_scope(|| match &result {
            Ok(outcome) => {
                self.metrics.record_completed();
                tracing::info!(
                    source_chunks = outcome.source_chunks,
                    summary_chunks = outcome.summary_chunks,
                    partial = outcome.is_partial(),
                    "Pipeline run completed"
                );
            }
            Err(error) => {
                self.metrics.record_failed();
                tracing::error!(stage = %error.stage(), error = %error, "Pipeline run failed");
            }
        });
        result
    }

    async fn run_stages(
        &self,
        run_id: String,
        document_sha256: String,
        pdf_bytes: Vec<u8>,
    ) -> Result<DigestOutcome, PipelineError> {
        let text = self.extract(pdf_bytes).await?;
        if text.trim().is_empty() {
            return Err(PipelineError::EmptyDocument);
        }

        let source_chunks = split_text(
            &text,
            self.settings.chunk_max_length,
            self.settings.split_policy,
        )?;
        let translation = self
            .runner
            .run(PipelineStage::Translating, source_chunks, |chunk| {
                let translator = Arc::clone(&self.translator);
                async move { translator.translate(&chunk).await }
            })
            .await;
        self.ensure_progress(&translation)?;
        let translated_text = translation.join(STAGE_JOIN_DELIMITER);

        let summary_chunks = split_text(
            &translated_text,
            self.settings.chunk_max_length,
            self.settings.split_policy,
        )?;
        let bounds = self.settings.summary_bounds;
        let summarization = self
            .runner
            .run(PipelineStage::Summarizing, summary_chunks, |chunk| {
                let summarizer = Arc::clone(&self.summarizer);
                async move { summarizer.summarize(&chunk, bounds).await }
            })
            .await;
        self.ensure_progress(&summarization)?;

        Ok(DigestOutcome {
            run_id,
            document_sha256,
            summary: summarization.join(STAGE_JOIN_DELIMITER),
            translated_text,
            source_chunks: translation.len(),
            summary_chunks: summarization.len(),
            translation_gaps: translation.failed_indices(),
            summary_gaps: summarization.failed_indices(),
        })
    }

    async fn extract(&self, pdf_bytes: Vec<u8>) -> Result<String, PipelineError> {
        let extractor = Arc::clone(&self.extractor);
        let text = tokio::task::spawn_blocking(move || extractor.extract(&pdf_bytes))
            .await
            .map_err(|error| ExtractionError::Worker(error.to_string()))??;
        tracing::debug!(chars = text.chars().count(), "Extraction finished");
        Ok(text)
    }

    /// Record the stage tally and abort when nothing came through.
    fn ensure_progress(&self, report: &StageReport) -> Result<(), PipelineError> {
        let failed = report.failures().len();
        self.metrics
            .record_stage(report.successes() as u64, failed as u64);
        if report.is_exhausted() {
            return Err(PipelineError::StageExhausted {
                stage: report.stage(),
                failed,
                total: report.len(),
                first_error: report.failures().first().map(|error| (*error).clone()),
            });
        }
        Ok(())
    }
}
