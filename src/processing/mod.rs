//! Document processing pipeline: chunking, per-chunk stages, and orchestration.

pub mod chunking;
pub mod pipeline;
mod service;
pub mod stage;
pub mod types;

pub use chunking::{SplitPolicy, split_text};
pub use pipeline::{DigestPipeline, PipelineSettings, STAGE_JOIN_DELIMITER};
pub use service::{DigestApi, DigestService};
pub use stage::{StageReport, StageRunner};
pub use types::{ChunkTransformError, ChunkingError, DigestOutcome, PipelineError, PipelineStage};

/// File name for the downloadable summary in `language`.
pub fn summary_file_name(language: &str) -> String {
    format!("summary_{language}.txt")
}

/// File name for the downloadable translation in `language`.
pub fn translation_file_name(language: &str) -> String {
    format!("translation_{language}.txt")
}
