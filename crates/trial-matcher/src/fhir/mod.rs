//! Normalization of FHIR R4 `Patient` and `Condition` resources into the
//! minimal profile the matcher consumes. Inputs are treated as untrusted:
//! every field is optional and absent or blank values degrade to labeled
//! defaults rather than errors.

use serde::Deserialize;

use crate::matching::{Condition, Patient};

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FhirPatient {
    pub id: Option<String>,
    pub name: Vec<HumanName>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct HumanName {
    pub given: Vec<String>,
    pub family: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FhirCondition {
    pub code: Option<CodeableConcept>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct CodeableConcept {
    pub text: Option<String>,
    pub coding: Vec<Coding>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Coding {
    pub code: Option<String>,
    pub display: Option<String>,
}

/// Flattens a FHIR patient plus their condition resources into the matcher's
/// profile shape.
pub fn normalize_patient(patient: &FhirPatient, conditions: &[FhirCondition]) -> Patient {
    Patient {
        id: patient.id.clone().unwrap_or_default(),
        name: display_name(&patient.name),
        gender: display_gender(patient.gender.as_deref()),
        birth_date: patient.birth_date.clone().unwrap_or_default(),
        conditions: conditions.iter().map(normalize_condition).collect(),
    }
}

fn display_name(names: &[HumanName]) -> String {
    let Some(name) = names.first() else {
        return "Unknown".to_string();
    };

    let parts: Vec<&str> = name
        .given
        .iter()
        .map(String::as_str)
        .chain(name.family.as_deref())
        .filter(|part| !part.trim().is_empty())
        .collect();

    if parts.is_empty() {
        "Unknown".to_string()
    } else {
        parts.join(" ")
    }
}

fn display_gender(gender: Option<&str>) -> String {
    match gender {
        Some(value) if !value.trim().is_empty() => {
            let mut chars = value.trim().chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => "Unknown".to_string(),
            }
        }
        _ => "Unknown".to_string(),
    }
}

fn normalize_condition(condition: &FhirCondition) -> Condition {
    let code = condition.code.as_ref();

    let name = code
        .and_then(|concept| concept.text.as_deref())
        .filter(|text| !text.trim().is_empty())
        .or_else(|| {
            code.and_then(|concept| {
                concept
                    .coding
                    .iter()
                    .find_map(|coding| coding.display.as_deref())
                    .filter(|display| !display.trim().is_empty())
            })
        })
        .unwrap_or("Unknown Condition")
        .to_string();

    let condition_code = code.and_then(|concept| {
        concept
            .coding
            .iter()
            .find_map(|coding| coding.code.as_deref())
            .map(str::to_string)
    });

    Condition {
        name,
        code: condition_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_given_and_family_name() {
        let patient = FhirPatient {
            id: Some("p-1".to_string()),
            name: vec![HumanName {
                given: vec!["John".to_string(), "Q".to_string()],
                family: Some("Smith".to_string()),
            }],
            gender: Some("male".to_string()),
            birth_date: Some("1958-03-15".to_string()),
        };

        let profile = normalize_patient(&patient, &[]);
        assert_eq!(profile.id, "p-1");
        assert_eq!(profile.name, "John Q Smith");
        assert_eq!(profile.gender, "Male");
        assert_eq!(profile.birth_date, "1958-03-15");
    }

    #[test]
    fn missing_name_and_gender_degrade_to_unknown() {
        let patient = FhirPatient::default();
        let profile = normalize_patient(&patient, &[]);
        assert_eq!(profile.name, "Unknown");
        assert_eq!(profile.gender, "Unknown");
        assert_eq!(profile.birth_date, "");
    }

    #[test]
    fn blank_name_parts_are_filtered() {
        let patient = FhirPatient {
            name: vec![HumanName {
                given: vec!["  ".to_string()],
                family: None,
            }],
            ..FhirPatient::default()
        };
        assert_eq!(normalize_patient(&patient, &[]).name, "Unknown");
    }

    #[test]
    fn condition_name_prefers_text_then_coding_display() {
        let with_text = FhirCondition {
            code: Some(CodeableConcept {
                text: Some("Type 2 Diabetes".to_string()),
                coding: vec![Coding {
                    code: Some("44054006".to_string()),
                    display: Some("Diabetes mellitus type 2".to_string()),
                }],
            }),
        };
        let with_display_only = FhirCondition {
            code: Some(CodeableConcept {
                text: None,
                coding: vec![Coding {
                    code: Some("254637007".to_string()),
                    display: Some("Non-small cell lung cancer".to_string()),
                }],
            }),
        };
        let bare = FhirCondition::default();

        let profile = normalize_patient(
            &FhirPatient::default(),
            &[with_text, with_display_only, bare],
        );

        assert_eq!(profile.conditions[0].name, "Type 2 Diabetes");
        assert_eq!(profile.conditions[0].code.as_deref(), Some("44054006"));
        assert_eq!(profile.conditions[1].name, "Non-small cell lung cancer");
        assert_eq!(profile.conditions[2].name, "Unknown Condition");
        assert_eq!(profile.conditions[2].code, None);
    }

    #[test]
    fn empty_text_falls_back_to_coding_display() {
        let condition = FhirCondition {
            code: Some(CodeableConcept {
                text: Some("".to_string()),
                coding: vec![Coding {
                    code: None,
                    display: Some("Hypertension".to_string()),
                }],
            }),
        };
        let profile = normalize_patient(&FhirPatient::default(), &[condition]);
        assert_eq!(profile.conditions[0].name, "Hypertension");
    }
}
