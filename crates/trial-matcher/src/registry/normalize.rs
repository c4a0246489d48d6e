use serde::{Deserialize, Serialize};

use crate::matching::Trial;

/// Raw v2 study record. Every level is optional; normalization supplies
/// defaults instead of failing on sparse records.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Study {
    pub protocol_section: ProtocolSection,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtocolSection {
    pub identification_module: IdentificationModule,
    pub status_module: StatusModule,
    pub description_module: DescriptionModule,
    pub design_module: DesignModule,
    pub eligibility_module: EligibilityModule,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentificationModule {
    pub nct_id: Option<String>,
    pub brief_title: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusModule {
    pub overall_status: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DescriptionModule {
    pub brief_summary: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignModule {
    pub phases: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EligibilityModule {
    pub eligibility_criteria: Option<String>,
}

/// Display-oriented view of a registry study, as returned by trial search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyListing {
    pub nct_id: String,
    pub brief_title: String,
    pub brief_summary: String,
    pub status: String,
    pub phase: String,
    pub eligibility_criteria: String,
}

impl StudyListing {
    /// The minimal shape the assessor consumes.
    pub fn trial(&self) -> Trial {
        Trial {
            nct_id: self.nct_id.clone(),
            brief_title: self.brief_title.clone(),
            eligibility_criteria: self.eligibility_criteria.clone(),
        }
    }
}

/// Flattens a raw registry record. Missing fields degrade to defaults;
/// normalization never fails.
pub fn normalize_study(study: &Study) -> StudyListing {
    let protocol = &study.protocol_section;

    StudyListing {
        nct_id: protocol
            .identification_module
            .nct_id
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        brief_title: protocol
            .identification_module
            .brief_title
            .clone()
            .unwrap_or_else(|| "Untitled Study".to_string()),
        brief_summary: protocol
            .description_module
            .brief_summary
            .clone()
            .unwrap_or_default(),
        status: protocol
            .status_module
            .overall_status
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        phase: protocol
            .design_module
            .phases
            .as_ref()
            .filter(|phases| !phases.is_empty())
            .map(|phases| phases.join(", "))
            .unwrap_or_else(|| "Not Specified".to_string()),
        eligibility_criteria: protocol
            .eligibility_module
            .eligibility_criteria
            .clone()
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_full_record() {
        let raw = serde_json::json!({
            "protocolSection": {
                "identificationModule": {
                    "nctId": "NCT01234567",
                    "briefTitle": "A Study of Things"
                },
                "statusModule": { "overallStatus": "RECRUITING" },
                "descriptionModule": { "briefSummary": "Summary text." },
                "designModule": { "phases": ["PHASE2", "PHASE3"] },
                "eligibilityModule": {
                    "eligibilityCriteria": "Inclusion Criteria:\n- Age 18 or older"
                }
            }
        });
        let study: Study = serde_json::from_value(raw).expect("deserializes");

        let listing = normalize_study(&study);

        assert_eq!(listing.nct_id, "NCT01234567");
        assert_eq!(listing.brief_title, "A Study of Things");
        assert_eq!(listing.status, "RECRUITING");
        assert_eq!(listing.phase, "PHASE2, PHASE3");
        assert!(listing.eligibility_criteria.contains("Age 18 or older"));
    }

    #[test]
    fn empty_record_degrades_to_defaults() {
        let study: Study = serde_json::from_value(serde_json::json!({})).expect("deserializes");

        let listing = normalize_study(&study);

        assert_eq!(listing.nct_id, "Unknown");
        assert_eq!(listing.brief_title, "Untitled Study");
        assert_eq!(listing.brief_summary, "");
        assert_eq!(listing.status, "Unknown");
        assert_eq!(listing.phase, "Not Specified");
        assert_eq!(listing.eligibility_criteria, "");
    }

    #[test]
    fn empty_phase_list_reads_not_specified() {
        let raw = serde_json::json!({
            "protocolSection": { "designModule": { "phases": [] } }
        });
        let study: Study = serde_json::from_value(raw).expect("deserializes");
        assert_eq!(normalize_study(&study).phase, "Not Specified");
    }

    #[test]
    fn listing_projects_to_trial() {
        let listing = StudyListing {
            nct_id: "NCT07654321".to_string(),
            brief_title: "Title".to_string(),
            brief_summary: "Summary".to_string(),
            status: "RECRUITING".to_string(),
            phase: "PHASE1".to_string(),
            eligibility_criteria: "criteria".to_string(),
        };

        let trial = listing.trial();
        assert_eq!(trial.nct_id, "NCT07654321");
        assert_eq!(trial.brief_title, "Title");
        assert_eq!(trial.eligibility_criteria, "criteria");
    }
}
