//! Demo stand-in for the LLM-backed assessor.
//!
//! Reproduces the scripted criteria heuristics used by the product demo:
//! a fixed criteria set judged against whatever patient data is on hand
//! (age, condition names, gender), with everything else delegated to an
//! injectable verdict sampler. The string matching here is demo fixture
//! logic only and is not part of the production scoring path.

use std::future::Future;

use chrono::{Local, NaiveDate};

use crate::matching::aggregate::Aggregator;
use crate::matching::domain::{AnalysisResult, CriterionJudgment, Patient, Trial, Verdict};

use super::TrialAssessor;

const MOCK_INCLUSION_CRITERIA: [&str; 5] = [
    "Age \u{2265} 18 years",
    "Histologically confirmed diagnosis of cancer",
    "ECOG performance status \u{2264} 2",
    "Adequate organ function",
    "Ability to understand and provide informed consent",
];

const MOCK_EXCLUSION_CRITERIA: [&str; 5] = [
    "Prior treatment with investigational agents within 4 weeks",
    "Known brain metastases",
    "History of allergic reactions to similar compounds",
    "Pregnant or breastfeeding",
    "Uncontrolled intercurrent illness",
];

/// Verdict source for criteria the heuristics cannot decide from patient
/// data. The reference demo drew weighted random verdicts here; injecting
/// the source keeps demos and tests reproducible.
pub trait JudgmentSampler: Send + Sync {
    fn inclusion_verdict(&self) -> Verdict;
    fn exclusion_verdict(&self) -> Verdict;
}

/// Default sampler: undecidable inclusion criteria are met, undecidable
/// exclusion criteria are avoided.
#[derive(Debug, Default, Clone, Copy)]
pub struct OptimisticSampler;

impl JudgmentSampler for OptimisticSampler {
    fn inclusion_verdict(&self) -> Verdict {
        Verdict::Yes
    }

    fn exclusion_verdict(&self) -> Verdict {
        Verdict::No
    }
}

pub struct MockAssessor<S = OptimisticSampler> {
    aggregator: Aggregator,
    sampler: S,
    // Fixed at construction so age judgments are stable within a batch.
    today: NaiveDate,
}

impl MockAssessor<OptimisticSampler> {
    pub fn new() -> Self {
        Self::with_sampler(OptimisticSampler)
    }
}

impl Default for MockAssessor<OptimisticSampler> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: JudgmentSampler> MockAssessor<S> {
    pub fn with_sampler(sampler: S) -> Self {
        Self {
            aggregator: Aggregator::default(),
            sampler,
            today: Local::now().date_naive(),
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn evaluate(&self, patient: &Patient, trial: &Trial) -> AnalysisResult {
        let inclusion: Vec<_> = MOCK_INCLUSION_CRITERIA
            .iter()
            .map(|criterion| self.judge_inclusion(criterion, patient))
            .collect();
        let exclusion: Vec<_> = MOCK_EXCLUSION_CRITERIA
            .iter()
            .map(|criterion| self.judge_exclusion(criterion, patient))
            .collect();

        let outcome = self.aggregator.aggregate(&inclusion, &exclusion);

        AnalysisResult {
            nct_id: trial.nct_id.clone(),
            score: Some(outcome.score),
            explanation: outcome.explanation,
            inclusion_criteria: inclusion,
            exclusion_criteria: exclusion,
        }
    }

    fn judge_inclusion(&self, criterion: &str, patient: &Patient) -> CriterionJudgment {
        if criterion.contains("Age") {
            let requirement = first_number(criterion).unwrap_or(18);
            return match patient.age_on(self.today) {
                Some(age) => {
                    let met = if age >= requirement {
                        Verdict::Yes
                    } else {
                        Verdict::No
                    };
                    let relation = if met == Verdict::Yes {
                        "meets"
                    } else {
                        "does not meet"
                    };
                    CriterionJudgment::new(
                        criterion,
                        met,
                        format!(
                            "Patient is {age} years old, which {relation} the age requirement of \u{2265} {requirement} years."
                        ),
                    )
                }
                None => CriterionJudgment::new(
                    criterion,
                    Verdict::Unknown,
                    "Patient's age is unknown. Additional information is needed to determine eligibility for this criterion.",
                ),
            };
        }

        if criterion.contains("cancer") || criterion.contains("diagnosis") {
            let has_cancer = patient.conditions.iter().any(|condition| {
                let name = condition.name.to_lowercase();
                name.contains("cancer") || name.contains("carcinoma") || name.contains("tumor")
            });
            let (met, relation) = if has_cancer {
                (Verdict::Yes, "has")
            } else {
                (Verdict::No, "does not have")
            };
            return CriterionJudgment::new(
                criterion,
                met,
                format!("Patient {relation} a confirmed cancer diagnosis."),
            );
        }

        if criterion.contains("ECOG") {
            // Performance status is not part of the matcher's patient shape.
            return CriterionJudgment::new(
                criterion,
                Verdict::Unknown,
                "Patient's ECOG performance status is unknown.",
            );
        }

        let met = self.sampler.inclusion_verdict();
        CriterionJudgment::new(criterion, met, generic_explanation(met))
    }

    fn judge_exclusion(&self, criterion: &str, patient: &Patient) -> CriterionJudgment {
        if criterion.contains("brain metastases") {
            let has_brain_mets = patient
                .conditions
                .iter()
                .any(|condition| condition.name.to_lowercase().contains("brain metastas"));
            let (met, relation) = if has_brain_mets {
                (Verdict::Yes, "has")
            } else {
                (Verdict::No, "does not have")
            };
            return CriterionJudgment::new(
                criterion,
                met,
                format!("Patient {relation} known brain metastases."),
            );
        }

        if criterion.contains("Pregnant") {
            return if patient.gender.eq_ignore_ascii_case("male") {
                CriterionJudgment::new(
                    criterion,
                    Verdict::No,
                    "Patient is male and cannot be pregnant.",
                )
            } else {
                CriterionJudgment::new(
                    criterion,
                    Verdict::Unknown,
                    "Patient is female and pregnancy status is unknown.",
                )
            };
        }

        let met = self.sampler.exclusion_verdict();
        CriterionJudgment::new(criterion, met, generic_explanation(met))
    }
}

impl<S: JudgmentSampler> TrialAssessor for MockAssessor<S> {
    fn assess(
        &self,
        patient: &Patient,
        trial: &Trial,
    ) -> impl Future<Output = AnalysisResult> + Send {
        std::future::ready(self.evaluate(patient, trial))
    }
}

fn generic_explanation(met: Verdict) -> &'static str {
    match met {
        Verdict::Yes => "Based on available information, patient meets this criterion.",
        Verdict::No => "Based on available information, patient does not meet this criterion.",
        Verdict::Unknown => "Insufficient information to determine if patient meets this criterion.",
    }
}

fn first_number(criterion: &str) -> Option<i32> {
    let digits: String = criterion
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
