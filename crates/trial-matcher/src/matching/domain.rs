use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Marker embedded in the explanation of every degraded result so consumers
/// can offer a retry keyed by `nctId` without a separate error channel.
pub const DEGRADED_EXPLANATION: &str = "Failed to analyze eligibility due to an error";

/// A diagnosed condition on a patient record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// The minimal patient profile the assessor consumes. Only `id` is required
/// so results stay attributable even when the record is sparse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Patient {
    /// Comma-separated condition names, as rendered into the assessor prompt.
    pub fn condition_names(&self) -> String {
        self.conditions
            .iter()
            .map(|condition| condition.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Age in whole years on `today`, when the birth date parses as YYYY-MM-DD.
    pub fn age_on(&self, today: NaiveDate) -> Option<i32> {
        let birth = NaiveDate::parse_from_str(self.birth_date.trim(), "%Y-%m-%d").ok()?;
        let mut age = today.year() - birth.year();
        if (today.month(), today.day()) < (birth.month(), birth.day()) {
            age -= 1;
        }
        Some(age)
    }
}

/// A clinical study record. `nct_id` is the registry identifier and the join
/// key for results; the criteria block mixes inclusion and exclusion prose
/// and may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trial {
    pub nct_id: String,
    #[serde(default)]
    pub brief_title: String,
    #[serde(default)]
    pub eligibility_criteria: String,
}

/// Three-valued verdict for a single criterion. `Unknown` is a first-class
/// outcome, distinct from a missing judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Yes,
    No,
    Unknown,
}

/// One eligibility criterion paired with its verdict and rationale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionJudgment {
    pub criterion: String,
    pub met: Verdict,
    pub explanation: String,
}

impl CriterionJudgment {
    pub fn new(criterion: impl Into<String>, met: Verdict, explanation: impl Into<String>) -> Self {
        Self {
            criterion: criterion.into(),
            met,
            explanation: explanation.into(),
        }
    }
}

/// Final assessment for one trial, keyed by `nct_id`.
///
/// Constructors always populate `score`; the `Option` exists so the sort step
/// can defensively sink score-less entries instead of panicking on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub nct_id: String,
    #[serde(default)]
    pub score: Option<u8>,
    pub explanation: String,
    #[serde(default)]
    pub inclusion_criteria: Vec<CriterionJudgment>,
    #[serde(default)]
    pub exclusion_criteria: Vec<CriterionJudgment>,
}

impl AnalysisResult {
    /// Canonical fallback when an assessment fails for any reason.
    pub fn degraded(nct_id: String) -> Self {
        Self {
            nct_id,
            score: Some(0),
            explanation: DEGRADED_EXPLANATION.to_string(),
            inclusion_criteria: Vec::new(),
            exclusion_criteria: Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.explanation.contains("Failed to analyze eligibility")
    }

    pub fn band(&self) -> EligibilityBand {
        EligibilityBand::from_score(self.score)
    }
}

/// Qualitative display band for a score, surfaced to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityBand {
    LikelyEligible,
    PossiblyEligible,
    LikelyIneligible,
    Unknown,
}

impl EligibilityBand {
    pub fn from_score(score: Option<u8>) -> Self {
        match score {
            None => Self::Unknown,
            Some(score) if score >= 80 => Self::LikelyEligible,
            Some(score) if score >= 50 => Self::PossiblyEligible,
            Some(_) => Self::LikelyIneligible,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::LikelyEligible => "Likely Eligible",
            Self::PossiblyEligible => "Possibly Eligible",
            Self::LikelyIneligible => "Likely Ineligible",
            Self::Unknown => "Eligibility Unknown",
        }
    }
}
