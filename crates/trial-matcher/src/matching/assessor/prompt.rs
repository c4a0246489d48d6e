use crate::matching::domain::{Patient, Trial};

/// System message sent alongside every assessment prompt.
pub const SYSTEM_PROMPT: &str = "You are a clinical research coordinator with expertise in \
                                 clinical trial eligibility assessment.";

/// Renders the fixed assessment prompt for a (patient, trial) pair.
///
/// The template is deterministic: the same inputs always produce the same
/// prompt text. It instructs the assessor to separate inclusion from
/// exclusion criteria, emit a three-valued verdict per criterion, score the
/// overall fit on the fixed 0-100 rubric, and reply with strict JSON.
pub fn render_prompt(patient: &Patient, trial: &Trial) -> String {
    format!(
        r#"
You are a clinical research coordinator assessing patient eligibility for clinical trials.

PATIENT INFORMATION:
- ID: {patient_id}
- Name: {patient_name}
- Gender: {gender}
- Birth Date: {birth_date}
- Medical Conditions: {conditions}

CLINICAL TRIAL:
- ID: {nct_id}
- Title: {title}

ELIGIBILITY CRITERIA:
{criteria}

Based on the patient information and the trial eligibility criteria, assess if this patient is likely eligible for this clinical trial.
Analyze each inclusion and exclusion criterion and determine if the patient meets it based on the available information.
If there's not enough information to determine eligibility for a specific criterion, note that.

Extract and analyze the key inclusion and exclusion criteria separately. For each criterion:
1. Identify if it's an inclusion or exclusion criterion
2. Determine if the patient meets it (yes), doesn't meet it (no), or if there's not enough information (unknown)
3. Provide a brief explanation for your determination

Then provide an overall assessment of eligibility with a score from 0-100, where:
- 0-30: Patient is clearly ineligible
- 31-50: Patient is likely ineligible
- 51-70: Patient may be eligible but more information is needed
- 71-90: Patient is likely eligible
- 91-100: Patient is clearly eligible

Return your response in JSON format with the following structure:
{{
  "score": number,
  "explanation": string,
  "inclusionCriteria": [
    {{
      "criterion": string,
      "met": "yes" | "no" | "unknown",
      "explanation": string
    }}
  ],
  "exclusionCriteria": [
    {{
      "criterion": string,
      "met": "yes" | "no" | "unknown",
      "explanation": string
    }}
  ]
}}
"#,
        patient_id = patient.id,
        patient_name = patient.name,
        gender = patient.gender,
        birth_date = patient.birth_date,
        conditions = patient.condition_names(),
        nct_id = trial.nct_id,
        title = trial.brief_title,
        criteria = trial.eligibility_criteria,
    )
}
