//! Batch orchestration of per-trial assessments.
//!
//! Two execution modes: chunked-parallel (bounded fan-out, whole-batch
//! result) and sequential-with-delay (one trial at a time, each result
//! published as it completes for incremental consumers). Both guarantee one
//! result per input trial, keyed by `nct_id`, with per-trial failures
//! isolated to their own slot.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::MatchingConfig;

use super::assessor::TrialAssessor;
use super::domain::{AnalysisResult, Patient, Trial};

/// Bounds on fan-out and pacing.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Trials assessed concurrently within one chunk. The sole admission
    /// control on outstanding assessor calls.
    pub chunk_size: usize,
    /// Delay between consecutive trials in sequential mode.
    pub pacing: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            chunk_size: 5,
            pacing: Duration::from_millis(500),
        }
    }
}

impl From<&MatchingConfig> for BatchOptions {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            pacing: Duration::from_millis(config.pacing_ms),
        }
    }
}

/// Drives an assessor across a batch of trials for one patient.
pub struct BatchAnalyzer<A> {
    assessor: Arc<A>,
    options: BatchOptions,
}

impl<A> Clone for BatchAnalyzer<A> {
    fn clone(&self) -> Self {
        Self {
            assessor: Arc::clone(&self.assessor),
            options: self.options.clone(),
        }
    }
}

impl<A: TrialAssessor + 'static> BatchAnalyzer<A> {
    pub fn new(assessor: Arc<A>) -> Self {
        Self::with_options(assessor, BatchOptions::default())
    }

    pub fn with_options(assessor: Arc<A>, mut options: BatchOptions) -> Self {
        options.chunk_size = options.chunk_size.max(1);
        Self { assessor, options }
    }

    /// Chunked-parallel mode: chunks run sequentially, trials within a chunk
    /// concurrently. Returns results sorted by score descending, stable on
    /// ties, with score-less entries sunk to the end.
    pub async fn analyze(&self, patient: &Patient, trials: &[Trial]) -> Vec<AnalysisResult> {
        let mut results = self.collect_chunked(patient, trials).await;
        sort_by_score(&mut results);
        info!(
            patient_id = %patient.id,
            trials = trials.len(),
            "eligibility batch complete"
        );
        results
    }

    async fn collect_chunked(&self, patient: &Patient, trials: &[Trial]) -> Vec<AnalysisResult> {
        let mut results = Vec::with_capacity(trials.len());

        for chunk in trials.chunks(self.options.chunk_size) {
            let mut tasks = JoinSet::new();
            for (offset, trial) in chunk.iter().enumerate() {
                let assessor = Arc::clone(&self.assessor);
                let patient = patient.clone();
                let trial = trial.clone();
                tasks.spawn(async move { (offset, assessor.assess(&patient, &trial).await) });
            }

            // Each task owns its result; reassembly is by chunk offset so
            // completion order can never misattribute an nct_id.
            let mut slots: Vec<Option<AnalysisResult>> = (0..chunk.len()).map(|_| None).collect();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((offset, result)) => slots[offset] = Some(result),
                    Err(err) => warn!(error = %err, "assessment task failed to join"),
                }
            }

            for (offset, slot) in slots.into_iter().enumerate() {
                results.push(
                    slot.unwrap_or_else(|| AnalysisResult::degraded(chunk[offset].nct_id.clone())),
                );
            }
        }

        results
    }

    /// Sequential-with-delay mode: one trial at a time, each result sent on
    /// `updates` as soon as it completes, with a fixed pacing delay between
    /// trials. Publish order equals input order. The full result set is also
    /// returned, unsorted, so the caller can apply the final ordering.
    pub async fn analyze_streaming(
        &self,
        patient: &Patient,
        trials: &[Trial],
        updates: mpsc::Sender<AnalysisResult>,
    ) -> Vec<AnalysisResult> {
        let mut results = Vec::with_capacity(trials.len());

        for (index, trial) in trials.iter().enumerate() {
            let result = self.assessor.assess(patient, trial).await;
            if updates.send(result.clone()).await.is_err() {
                // Receiver gone; keep assessing so the returned set stays
                // one-to-one with the input.
                warn!(nct_id = %trial.nct_id, "update receiver dropped");
            }
            results.push(result);

            if index + 1 < trials.len() {
                tokio::time::sleep(self.options.pacing).await;
            }
        }

        results
    }
}

/// Stable score-descending sort. Entries without a score never occur after
/// aggregation, but are defensively sunk to the end rather than panicking.
pub fn sort_by_score(results: &mut [AnalysisResult]) {
    results.sort_by(|a, b| match (a.score, b.score) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(left), Some(right)) => right.cmp(&left),
    });
}
