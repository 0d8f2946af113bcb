//! Bounded-concurrency execution of one transform across a chunk sequence.
//!
//! Chunks are independent, so the runner keeps up to `concurrency` transform calls in flight
//! and records each result in the slot of the chunk it came from. Completion order never leaks
//! into the output. A failing or timed-out chunk is recorded and the remaining chunks proceed;
//! whether a failed stage aborts the run is the orchestrator's call.

use super::types::{ChunkTransformError, PipelineStage};
use futures_util::stream::{self, StreamExt};
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

/// Executes a transform over every chunk of a stage.
#[derive(Debug, Clone, Copy)]
pub struct StageRunner {
    concurrency: usize,
    chunk_timeout: Option<Duration>,
}

impl StageRunner {
    /// Create a runner with the given concurrency degree; `1` runs chunks serially.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            chunk_timeout: None,
        }
    }

    /// Treat any transform call that exceeds `timeout` as a failed chunk.
    pub fn with_chunk_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.chunk_timeout = timeout;
        self
    }

    /// Concurrency degree in effect.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Apply `transform` to every chunk and collect the results in input order.
    pub async fn run<F, Fut, E>(
        &self,
        stage: PipelineStage,
        chunks: Vec<String>,
        transform: F,
    ) -> StageReport
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<String, E>>,
        E: Display,
    {
        let total = chunks.len();
        let started = Instant::now();
        let transform = &transform;
        let timeout = self.chunk_timeout;
        tracing::info!(
            stage = %stage,
            chunks = total,
            concurrency = self.concurrency,
            "Stage started"
        );

        let mut slots: Vec<Option<Result<String, ChunkTransformError>>> = vec![None; total];
        let mut completions = stream::iter(chunks.into_iter().enumerate())
            .map(move |(index, chunk)| async move {
                let outcome = match timeout {
                    Some(limit) => match tokio::time::timeout(limit, transform(chunk)).await {
                        Ok(result) => result.map_err(|error| error.to_string()),
                        Err(_) => Err(format!("timed out after {} ms", limit.as_millis())),
                    },
                    None => transform(chunk).await.map_err(|error| error.to_string()),
                };
                (
                    index,
                    outcome.map_err(|message| ChunkTransformError { index, message }),
                )
            })
            .buffer_unordered(self.concurrency);

        while let Some((index, result)) = completions.next().await {
            if let Err(error) = &result {
                tracing::warn!(stage = %stage, index, error = %error.message, "Chunk transform failed");
            }
            slots[index] = Some(result);
        }

        let results: Vec<Result<String, ChunkTransformError>> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    Err(ChunkTransformError {
                        index,
                        message: "no result recorded".into(),
                    })
                })
            })
            .collect();

        let report = StageReport { stage, results };
        tracing::info!(
            stage = %stage,
            succeeded = report.successes(),
            failed = report.failures().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Stage finished"
        );
        report
    }
}

/// Per-chunk results of one stage, aligned with the stage input.
#[derive(Debug, Clone)]
pub struct StageReport {
    stage: PipelineStage,
    results: Vec<Result<String, ChunkTransformError>>,
}

impl StageReport {
    /// Stage these results belong to.
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Results indexed by original chunk position.
    pub fn results(&self) -> &[Result<String, ChunkTransformError>] {
        &self.results
    }

    /// Number of chunks submitted.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the stage had no chunks at all.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of chunks that produced output.
    pub fn successes(&self) -> usize {
        self.results.iter().filter(|result| result.is_ok()).count()
    }

    /// Recorded failures in index order.
    pub fn failures(&self) -> Vec<&ChunkTransformError> {
        self.results
            .iter()
            .filter_map(|result| result.as_ref().err())
            .collect()
    }

    /// Indices of chunks that failed.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures().into_iter().map(|error| error.index).collect()
    }

    /// True when no chunk produced output.
    pub fn is_exhausted(&self) -> bool {
        self.successes() == 0
    }

    /// Join successful outputs in index order, skipping failed chunks.
    pub fn join(&self, delimiter: &str) -> String {
        self.results
            .iter()
            .filter_map(|result| result.as_ref().ok())
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(delimiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chunks(count: usize) -> Vec<String> {
        (0..count).map(|index| format!("chunk-{index}")).collect()
    }

    #[tokio::test]
    async fn results_follow_input_order_despite_completion_order() {
        let runner = StageRunner::new(4);
        let count = 8;
        let report = runner
            .run(PipelineStage::Translating, chunks(count), |chunk| async move {
                let index: u64 = chunk.trim_start_matches("chunk-").parse().expect("index");
                // Later chunks finish first; a pseudo-random jitter shuffles the rest.
                let jitter = (index * 7919) % 5;
                let delay = (count as u64 - index) * 10 + jitter;
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok::<_, String>(chunk.to_uppercase())
            })
            .await;

        assert_eq!(report.len(), count);
        for (index, result) in report.results().iter().enumerate() {
            assert_eq!(result.as_deref(), Ok(format!("CHUNK-{index}").as_str()));
        }
    }

    #[tokio::test]
    async fn failure_is_isolated_to_its_chunk() {
        let runner = StageRunner::new(3);
        let report = runner
            .run(PipelineStage::Translating, chunks(5), |chunk| async move {
                if chunk == "chunk-2" {
                    Err("engine exploded".to_string())
                } else {
                    Ok(chunk)
                }
            })
            .await;

        assert_eq!(report.successes(), 4);
        assert_eq!(report.failed_indices(), vec![2]);
        assert!(!report.is_exhausted());
        let failure = report.failures()[0];
        assert_eq!(failure.index, 2);
        assert_eq!(failure.message, "engine exploded");
        assert_eq!(
            report.join("\n\n"),
            "chunk-0\n\nchunk-1\n\nchunk-3\n\nchunk-4"
        );
    }

    #[tokio::test]
    async fn concurrency_degree_bounds_in_flight_calls() {
        for degree in [1, 3] {
            let in_flight = Arc::new(AtomicUsize::new(0));
            let peak = Arc::new(AtomicUsize::new(0));
            let runner = StageRunner::new(degree);
            let report = runner
                .run(PipelineStage::Summarizing, chunks(9), |chunk| {
                    let in_flight = in_flight.clone();
                    let peak = peak.clone();
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, String>(chunk)
                    }
                })
                .await;

            assert_eq!(report.successes(), 9);
            assert!(peak.load(Ordering::SeqCst) <= degree);
        }
    }

    #[tokio::test]
    async fn slow_chunk_times_out_as_failure() {
        let runner = StageRunner::new(2).with_chunk_timeout(Some(Duration::from_millis(20)));
        let report = runner
            .run(PipelineStage::Summarizing, chunks(3), |chunk| async move {
                if chunk == "chunk-1" {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
                Ok::<_, String>(chunk)
            })
            .await;

        assert_eq!(report.failed_indices(), vec![1]);
        assert!(report.failures()[0].message.contains("timed out"));
        assert_eq!(report.join(" "), "chunk-0 chunk-2");
    }

    #[tokio::test]
    async fn empty_stage_is_exhausted() {
        let report = StageRunner::new(4)
            .run(PipelineStage::Translating, Vec::new(), |chunk| async move {
                Ok::<_, String>(chunk)
            })
            .await;
        assert!(report.is_empty());
        assert!(report.is_exhausted());
        assert_eq!(report.join("\n\n"), "");
    }

    #[test]
    fn zero_concurrency_is_clamped_to_serial() {
        assert_eq!(StageRunner::new(0).concurrency(), 1);
    }
}
