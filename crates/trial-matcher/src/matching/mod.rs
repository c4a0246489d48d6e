//! The eligibility-scoring pipeline: criteria assessor adapters, the
//! aggregation rules, and batch orchestration across trials.

pub mod assessor;
mod aggregate;
mod batch;
pub mod domain;

pub use aggregate::{
    Aggregate, Aggregator, BandSampler, Disqualification, MidpointSampler, ScoreBand, ScorePolicy,
};
pub use batch::{sort_by_score, BatchAnalyzer, BatchOptions};
pub use domain::{
    AnalysisResult, Condition, CriterionJudgment, EligibilityBand, Patient, Trial, Verdict,
    DEGRADED_EXPLANATION,
};
