//! Core data types and error definitions for the digest pipeline.

use crate::extraction::ExtractionError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors produced while splitting text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Caller configured an impossible length budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Failure of one transform call, recorded against the chunk it was applied to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("chunk {index} failed: {message}")]
pub struct ChunkTransformError {
    /// Position of the chunk in its stage input.
    pub index: usize,
    /// Reason reported by the engine, or the timeout notice.
    pub message: String,
}

/// Steps of one pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading text out of the uploaded PDF.
    Extracting,
    /// Splitting text into bounded chunks.
    Chunking,
    /// Translating source-language chunks.
    Translating,
    /// Summarizing translated chunks.
    Summarizing,
}

impl PipelineStage {
    /// Lowercase name used in logs and API responses.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Extracting => "extracting",
            Self::Chunking => "chunking",
            Self::Translating => "translating",
            Self::Summarizing => "summarizing",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The upload could not be read as a PDF.
    #[error("Failed to extract text: {0}")]
    Extraction(#[from] ExtractionError),
    /// The PDF parsed but carried no text layer.
    #[error("Document contains no extractable text")]
    EmptyDocument,
    /// Chunking rejected its parameters.
    #[error("Failed to chunk text: {0}")]
    Chunking(#[from] ChunkingError),
    /// Every chunk in a stage failed, or the stage had nothing to work on.
    #[error("{stage} produced no usable output ({failed} of {total} chunks failed){}", first_error_suffix(.first_error))]
    StageExhausted {
        /// Stage that ran out of successful chunks.
        stage: PipelineStage,
        /// Number of failed chunks.
        failed: usize,
        /// Number of chunks submitted.
        total: usize,
        /// First recorded chunk failure, when there was one.
        first_error: Option<ChunkTransformError>,
    },
}

fn first_error_suffix(first_error: &Option<ChunkTransformError>) -> String {
    first_error
        .as_ref()
        .map(|error| format!(": {error}"))
        .unwrap_or_default()
}

impl PipelineError {
    /// Step of the run that produced this error.
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Extraction(_) | Self::EmptyDocument => PipelineStage::Extracting,
            Self::Chunking(_) => PipelineStage::Chunking,
            Self::StageExhausted { stage, .. } => *stage,
        }
    }
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct DigestOutcome {
    /// Identifier attached to every log line of the run.
    pub run_id: String,
    /// SHA-256 of the uploaded bytes, hex encoded.
    pub document_sha256: String,
    /// Joined summary text.
    pub summary: String,
    /// Joined translated text.
    pub translated_text: String,
    /// Number of chunks submitted to translation.
    pub source_chunks: usize,
    /// Number of chunks submitted to summarization.
    pub summary_chunks: usize,
    /// Translation chunk indices missing from `translated_text`.
    pub translation_gaps: Vec<usize>,
    /// Summarization chunk indices missing from `summary`.
    pub summary_gaps: Vec<usize>,
}

impl DigestOutcome {
    /// Whether any chunk was dropped in either stage.
    pub fn is_partial(&self) -> bool {
        !self.translation_gaps.is_empty() || !self.summary_gaps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_exhausted_reports_originating_stage() {
        let error = PipelineError::StageExhausted {
            stage: PipelineStage::Summarizing,
            failed: 2,
            total: 2,
            first_error: Some(ChunkTransformError {
                index: 0,
                message: "model offline".into(),
            }),
        };
        assert_eq!(error.stage(), PipelineStage::Summarizing);
        let message = error.to_string();
        assert!(message.starts_with("summarizing produced no usable output"));
        assert!(message.contains("chunk 0 failed: model offline"));
    }

    #[test]
    fn extraction_errors_belong_to_extracting_stage() {
        let error = PipelineError::from(ExtractionError::NoPages);
        assert_eq!(error.stage(), PipelineStage::Extracting);
        assert_eq!(PipelineError::EmptyDocument.stage(), PipelineStage::Extracting);
    }
}
