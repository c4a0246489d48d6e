use super::domain::{CriterionJudgment, Verdict};

/// Inclusive score range used when a precedence rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBand {
    pub low: u8,
    pub high: u8,
}

impl ScoreBand {
    pub const fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }

    pub fn contains(self, score: u8) -> bool {
        score >= self.low && score <= self.high
    }
}

/// Numeric bounds for the aggregation rules.
///
/// The disqualification bands are inherited demo constants rather than a
/// considered clinical policy, so they are configurable here instead of being
/// baked into the rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorePolicy {
    /// Band for a patient ruled out by a met exclusion criterion.
    pub exclusion_veto_band: ScoreBand,
    /// Band for a patient ruled out by a failed inclusion criterion.
    pub inclusion_failure_band: ScoreBand,
    /// Lowest score a non-disqualified patient can receive.
    pub qualified_floor: u8,
    /// Weight of the penalty applied per share of unknown verdicts.
    pub unknown_penalty_weight: f64,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            exclusion_veto_band: ScoreBand::new(0, 29),
            inclusion_failure_band: ScoreBand::new(10, 39),
            qualified_floor: 40,
            unknown_penalty_weight: 20.0,
        }
    }
}

/// Picks the concrete score inside a disqualification band.
///
/// The reference behavior drew these at random; keeping the choice behind a
/// trait lets demos inject variation while tests and production stay
/// deterministic.
pub trait BandSampler: Send + Sync {
    fn pick(&self, band: ScoreBand) -> u8;
}

/// Default sampler: the band midpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct MidpointSampler;

impl BandSampler for MidpointSampler {
    fn pick(&self, band: ScoreBand) -> u8 {
        band.low + (band.high - band.low) / 2
    }
}

/// Why a patient was ruled out, when they were.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disqualification {
    ExclusionMet { criterion: String },
    InclusionFailed { criterion: String },
}

/// Output of aggregation: the final score, the human-readable explanation,
/// and the disqualification state.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub score: u8,
    pub explanation: String,
    pub disqualification: Option<Disqualification>,
}

/// Applies the fixed precedence rules over criterion judgments: exclusion
/// veto, then inclusion failure, then partial-credit scoring. Pure and
/// deterministic for a given sampler.
pub struct Aggregator {
    policy: ScorePolicy,
    sampler: Box<dyn BandSampler>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(ScorePolicy::default())
    }
}

impl Aggregator {
    pub fn new(policy: ScorePolicy) -> Self {
        Self::with_sampler(policy, Box::new(MidpointSampler))
    }

    pub fn with_sampler(policy: ScorePolicy, sampler: Box<dyn BandSampler>) -> Self {
        Self { policy, sampler }
    }

    pub fn policy(&self) -> &ScorePolicy {
        &self.policy
    }

    pub fn aggregate(
        &self,
        inclusion: &[CriterionJudgment],
        exclusion: &[CriterionJudgment],
    ) -> Aggregate {
        // Meeting any exclusion criterion disqualifies outright, regardless
        // of the inclusion results.
        if let Some(hit) = exclusion.iter().find(|c| c.met == Verdict::Yes) {
            return Aggregate {
                score: self.sampler.pick(self.policy.exclusion_veto_band),
                explanation: format!(
                    "Patient is ineligible because they meet an exclusion criterion: \"{}\". \
                     Meeting any exclusion criterion automatically disqualifies a patient from the trial.",
                    hit.criterion
                ),
                disqualification: Some(Disqualification::ExclusionMet {
                    criterion: hit.criterion.clone(),
                }),
            };
        }

        if let Some(missed) = inclusion.iter().find(|c| c.met == Verdict::No) {
            return Aggregate {
                score: self.sampler.pick(self.policy.inclusion_failure_band),
                explanation: format!(
                    "Patient is ineligible because they do not meet an inclusion criterion: \"{}\". \
                     All inclusion criteria must be met to qualify for the trial.",
                    missed.criterion
                ),
                disqualification: Some(Disqualification::InclusionFailed {
                    criterion: missed.criterion.clone(),
                }),
            };
        }

        if inclusion.is_empty() && exclusion.is_empty() {
            return Aggregate {
                score: self.policy.qualified_floor,
                explanation: "No eligibility criteria could be evaluated for this trial. \
                              Additional information is needed to assess eligibility."
                    .to_string(),
                disqualification: None,
            };
        }

        self.partial_credit(inclusion, exclusion)
    }

    fn partial_credit(
        &self,
        inclusion: &[CriterionJudgment],
        exclusion: &[CriterionJudgment],
    ) -> Aggregate {
        let met_inclusion = count(inclusion, Verdict::Yes);
        let total_inclusion = inclusion.len();
        let avoided_exclusion = count(exclusion, Verdict::No);
        let total_exclusion = exclusion.len();
        let unknown = count(inclusion, Verdict::Unknown) + count(exclusion, Verdict::Unknown);
        let total = total_inclusion + total_exclusion;

        let inclusion_ratio = ratio(met_inclusion, total_inclusion);
        let exclusion_ratio = ratio(avoided_exclusion, total_exclusion);
        let penalty = self.policy.unknown_penalty_weight * unknown as f64 / total as f64;

        let raw = ((inclusion_ratio * 100.0 + exclusion_ratio * 100.0) / 2.0 - penalty).round();
        let score = raw.clamp(f64::from(self.policy.qualified_floor), 100.0) as u8;

        Aggregate {
            explanation: partial_explanation(
                score,
                met_inclusion,
                total_inclusion,
                avoided_exclusion,
                total_exclusion,
                unknown,
            ),
            score,
            disqualification: None,
        }
    }
}

fn count(judgments: &[CriterionJudgment], verdict: Verdict) -> usize {
    judgments.iter().filter(|c| c.met == verdict).count()
}

fn ratio(met: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        met as f64 / total as f64
    }
}

fn partial_explanation(
    score: u8,
    met_inclusion: usize,
    total_inclusion: usize,
    avoided_exclusion: usize,
    total_exclusion: usize,
    unknown: usize,
) -> String {
    if score >= 80 {
        if unknown == 0 {
            format!(
                "Patient meets all {met_inclusion}/{total_inclusion} inclusion criteria and avoids \
                 all {avoided_exclusion}/{total_exclusion} exclusion criteria. The patient is \
                 eligible for this trial."
            )
        } else {
            format!(
                "Patient meets {met_inclusion}/{total_inclusion} inclusion criteria and avoids \
                 {avoided_exclusion}/{total_exclusion} exclusion criteria, with {unknown} unknown \
                 factors. The patient is likely eligible, but additional information may be needed."
            )
        }
    } else if score >= 50 {
        format!(
            "Patient meets {met_inclusion}/{total_inclusion} inclusion criteria and avoids \
             {avoided_exclusion}/{total_exclusion} exclusion criteria, with {unknown} unknown \
             factors. The patient may be eligible, but additional information is needed to confirm."
        )
    } else {
        format!(
            "Patient only meets {met_inclusion}/{total_inclusion} inclusion criteria and/or avoids \
             {avoided_exclusion}/{total_exclusion} exclusion criteria, with {unknown} unknown \
             factors. The patient is likely not eligible for this trial."
        )
    }
}
