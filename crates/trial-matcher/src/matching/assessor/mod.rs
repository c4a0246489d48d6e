//! Criteria assessor adapters.
//!
//! An assessor takes a (patient, trial) pair and returns an `AnalysisResult`,
//! never an error: every failure mode (transport, timeout, schema violation)
//! is absorbed here and converted into the canonical degraded result so a
//! batch is never aborted by one bad trial.

mod mock;
mod openai;
mod parser;
mod prompt;

pub use mock::{JudgmentSampler, MockAssessor, OptimisticSampler};
pub use openai::OpenAiChatClient;
pub use parser::{parse_assessment, ParseError, ParsedAssessment};
pub use prompt::{render_prompt, SYSTEM_PROMPT};

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::aggregate::Aggregator;
use super::domain::{AnalysisResult, Patient, Trial};

/// Request handed to the chat backend: the rendered prompt plus the
/// determinism settings the eligibility contract requires.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub json_mode: bool,
}

/// Raw chat-completion transport behind the assessor.
pub trait ChatClient: Send + Sync {
    fn complete(
        &self,
        request: ChatRequest,
    ) -> impl Future<Output = Result<String, AssessorError>> + Send;
}

/// Failures internal to a single assessment. These never propagate past the
/// adapter; they are logged and replaced with a degraded result.
#[derive(Debug, thiserror::Error)]
pub enum AssessorError {
    #[error("assessor request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("assessor call timed out after {0:?}")]
    Timeout(Duration),
    #[error("assessor returned status {0}")]
    Status(u16),
    #[error("assessor returned no completion content")]
    EmptyResponse,
    #[error("assessor API key is not configured")]
    MissingApiKey,
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Per-trial assessment entry point driven by the batch orchestrator.
pub trait TrialAssessor: Send + Sync {
    /// Assess one trial for one patient. Infallible by contract: failures
    /// must be folded into the returned result.
    fn assess(
        &self,
        patient: &Patient,
        trial: &Trial,
    ) -> impl Future<Output = AnalysisResult> + Send;
}

/// Production assessor: renders the prompt, invokes the chat backend once,
/// parses the JSON verdicts, and aggregates the final score.
pub struct LlmAssessor<C> {
    client: C,
    aggregator: Aggregator,
    temperature: f32,
}

impl<C: ChatClient> LlmAssessor<C> {
    pub fn new(client: C) -> Self {
        Self::with_aggregator(client, Aggregator::default())
    }

    pub fn with_aggregator(client: C, aggregator: Aggregator) -> Self {
        Self {
            client,
            aggregator,
            temperature: 0.2,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    async fn try_assess(
        &self,
        patient: &Patient,
        trial: &Trial,
    ) -> Result<AnalysisResult, AssessorError> {
        let request = ChatRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: render_prompt(patient, trial),
            temperature: self.temperature,
            json_mode: true,
        };

        let body = self.client.complete(request).await?;
        let parsed = parse_assessment(&body)?;
        debug!(
            nct_id = %trial.nct_id,
            raw_score = parsed.raw_score,
            inclusion = parsed.inclusion_criteria.len(),
            exclusion = parsed.exclusion_criteria.len(),
            "assessment parsed"
        );

        let outcome = self
            .aggregator
            .aggregate(&parsed.inclusion_criteria, &parsed.exclusion_criteria);

        Ok(AnalysisResult {
            nct_id: trial.nct_id.clone(),
            score: Some(outcome.score),
            explanation: outcome.explanation,
            inclusion_criteria: parsed.inclusion_criteria,
            exclusion_criteria: parsed.exclusion_criteria,
        })
    }
}

impl<C: ChatClient> TrialAssessor for LlmAssessor<C> {
    fn assess(
        &self,
        patient: &Patient,
        trial: &Trial,
    ) -> impl Future<Output = AnalysisResult> + Send {
        async move {
            match self.try_assess(patient, trial).await {
                Ok(result) => result,
                Err(err) => {
                    warn!(
                        nct_id = %trial.nct_id,
                        error = %err,
                        "eligibility assessment failed; returning degraded result"
                    );
                    AnalysisResult::degraded(trial.nct_id.clone())
                }
            }
        }
    }
}
