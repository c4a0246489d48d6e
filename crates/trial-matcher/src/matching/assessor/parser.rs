use serde::Deserialize;

use crate::matching::domain::{CriterionJudgment, Verdict};

/// Schema violations in the assessor's reply. All of these collapse to the
/// degraded fallback result in the adapter; none reach its caller.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("assessment payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("assessment payload is missing a score")]
    MissingScore,
    #[error("assessment score {0} is outside 0-100")]
    ScoreOutOfRange(i64),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAssessment {
    score: Option<f64>,
    explanation: Option<String>,
    #[serde(default)]
    inclusion_criteria: Vec<RawCriterion>,
    #[serde(default)]
    exclusion_criteria: Vec<RawCriterion>,
}

#[derive(Debug, Deserialize)]
struct RawCriterion {
    #[serde(default)]
    criterion: String,
    met: Option<String>,
    #[serde(default)]
    explanation: String,
}

/// The judgment lists plus the assessor's own raw score and explanation.
/// The aggregator recomputes the final score from the judgments; the raw
/// values are retained for observability.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAssessment {
    pub raw_score: u8,
    pub raw_explanation: String,
    pub inclusion_criteria: Vec<CriterionJudgment>,
    pub exclusion_criteria: Vec<CriterionJudgment>,
}

/// Parses the assessor's reply into criterion judgments.
///
/// The score must be present and within 0-100; everything else degrades
/// softly (missing criterion text becomes empty, unrecognized verdicts map
/// to `unknown` rather than dropping the entry).
pub fn parse_assessment(body: &str) -> Result<ParsedAssessment, ParseError> {
    let raw: RawAssessment = serde_json::from_str(strip_fences(body))?;

    let score = raw.score.ok_or(ParseError::MissingScore)?;
    let rounded = score.round() as i64;
    if !(0..=100).contains(&rounded) {
        return Err(ParseError::ScoreOutOfRange(rounded));
    }

    Ok(ParsedAssessment {
        raw_score: rounded as u8,
        raw_explanation: raw.explanation.unwrap_or_default(),
        inclusion_criteria: raw.inclusion_criteria.into_iter().map(judgment).collect(),
        exclusion_criteria: raw.exclusion_criteria.into_iter().map(judgment).collect(),
    })
}

fn judgment(raw: RawCriterion) -> CriterionJudgment {
    CriterionJudgment {
        criterion: raw.criterion,
        met: verdict(raw.met.as_deref()),
        explanation: raw.explanation,
    }
}

fn verdict(raw: Option<&str>) -> Verdict {
    match raw.map(|value| value.trim().to_ascii_lowercase()) {
        Some(value) if value == "yes" => Verdict::Yes,
        Some(value) if value == "no" => Verdict::No,
        _ => Verdict::Unknown,
    }
}

/// Models occasionally wrap JSON-mode output in a markdown fence.
fn strip_fences(body: &str) -> &str {
    let trimmed = body.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_assessment() {
        let body = r#"{
            "score": 85,
            "explanation": "Likely eligible",
            "inclusionCriteria": [
                {"criterion": "Age >= 18", "met": "yes", "explanation": "Patient is 62"}
            ],
            "exclusionCriteria": [
                {"criterion": "Known brain metastases", "met": "no", "explanation": "No CNS involvement recorded"}
            ]
        }"#;

        let parsed = parse_assessment(body).expect("parses");
        assert_eq!(parsed.raw_score, 85);
        assert_eq!(parsed.raw_explanation, "Likely eligible");
        assert_eq!(parsed.inclusion_criteria.len(), 1);
        assert_eq!(parsed.inclusion_criteria[0].met, Verdict::Yes);
        assert_eq!(parsed.exclusion_criteria[0].met, Verdict::No);
    }

    #[test]
    fn rejects_non_json_text() {
        let err = parse_assessment("the patient looks eligible to me").expect_err("must fail");
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn rejects_missing_score() {
        let err = parse_assessment(r#"{"explanation": "no score here"}"#).expect_err("must fail");
        assert!(matches!(err, ParseError::MissingScore));
    }

    #[test]
    fn rejects_out_of_range_score() {
        let err = parse_assessment(r#"{"score": 250, "explanation": ""}"#).expect_err("must fail");
        assert!(matches!(err, ParseError::ScoreOutOfRange(250)));
    }

    #[test]
    fn unrecognized_verdicts_map_to_unknown() {
        let body = r#"{
            "score": 60,
            "inclusionCriteria": [
                {"criterion": "Adequate organ function", "met": "maybe", "explanation": ""},
                {"criterion": "Informed consent"}
            ],
            "exclusionCriteria": []
        }"#;

        let parsed = parse_assessment(body).expect("parses");
        assert_eq!(parsed.inclusion_criteria[0].met, Verdict::Unknown);
        assert_eq!(parsed.inclusion_criteria[1].met, Verdict::Unknown);
    }

    #[test]
    fn verdicts_are_case_insensitive() {
        let body = r#"{
            "score": 60,
            "inclusionCriteria": [{"criterion": "c", "met": " Yes ", "explanation": ""}],
            "exclusionCriteria": [{"criterion": "c", "met": "NO", "explanation": ""}]
        }"#;

        let parsed = parse_assessment(body).expect("parses");
        assert_eq!(parsed.inclusion_criteria[0].met, Verdict::Yes);
        assert_eq!(parsed.exclusion_criteria[0].met, Verdict::No);
    }

    #[test]
    fn strips_markdown_fences() {
        let body = "```json\n{\"score\": 55, \"explanation\": \"fenced\"}\n```";
        let parsed = parse_assessment(body).expect("parses");
        assert_eq!(parsed.raw_score, 55);
        assert_eq!(parsed.raw_explanation, "fenced");
    }

    #[test]
    fn missing_criteria_arrays_default_to_empty() {
        let parsed = parse_assessment(r#"{"score": 40}"#).expect("parses");
        assert!(parsed.inclusion_criteria.is_empty());
        assert!(parsed.exclusion_criteria.is_empty());
        assert_eq!(parsed.raw_explanation, "");
    }
}
