use chrono::{Local, NaiveDate};
use clap::Args;
use std::sync::Arc;
use tokio::sync::mpsc;
use trial_matcher::error::AppError;
use trial_matcher::matching::assessor::MockAssessor;
use trial_matcher::matching::{
    sort_by_score, AnalysisResult, BatchAnalyzer, BatchOptions, Condition, Patient, Trial,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Sample patient to match (1-3)
    #[arg(long, default_value_t = 1)]
    pub(crate) patient: usize,
    /// Stream results one trial at a time instead of running the full batch
    #[arg(long)]
    pub(crate) streaming: bool,
    /// Override the evaluation date for age judgments (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Show per-criterion verdicts for each trial
    #[arg(long)]
    pub(crate) verbose: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let patients = sample_patients();
    let index = args.patient.saturating_sub(1);
    let patient = patients.get(index).ok_or_else(|| {
        AppError::InvalidRequest(format!(
            "patient must be between 1 and {}",
            patients.len()
        ))
    })?;

    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let trials = sample_trials();

    println!("Clinical trial matching demo (mock assessor)");
    println!(
        "Patient: {} | {} | born {}",
        patient.name, patient.gender, patient.birth_date
    );
    println!("Conditions: {}", patient.condition_names());
    println!("Candidate trials: {}", trials.len());

    let assessor = MockAssessor::new().with_today(today);
    let analyzer = BatchAnalyzer::with_options(Arc::new(assessor), BatchOptions::default());

    let mut results = if args.streaming {
        println!("\nStreaming results as they complete:");
        let (tx, mut rx) = mpsc::channel(8);
        let (results, ()) = tokio::join!(analyzer.analyze_streaming(patient, &trials, tx), async {
            while let Some(result) = rx.recv().await {
                render_update(&result);
            }
        });
        results
    } else {
        analyzer.analyze(patient, &trials).await
    };

    sort_by_score(&mut results);

    println!("\nRanked results");
    for result in &results {
        render_result(result, &trials, args.verbose);
    }

    Ok(())
}

fn render_update(result: &AnalysisResult) {
    let score = result
        .score
        .map(|score| score.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!("  {} -> score {} ({})", result.nct_id, score, result.band().label());
}

fn render_result(result: &AnalysisResult, trials: &[Trial], verbose: bool) {
    let title = trials
        .iter()
        .find(|trial| trial.nct_id == result.nct_id)
        .map(|trial| trial.brief_title.as_str())
        .unwrap_or("(unknown trial)");
    let score = result
        .score
        .map(|score| score.to_string())
        .unwrap_or_else(|| "-".to_string());

    println!("- {} | {}", result.nct_id, title);
    println!("  Score {} -> {}", score, result.band().label());
    println!("  {}", result.explanation);

    if verbose {
        println!("  Inclusion criteria:");
        for judgment in &result.inclusion_criteria {
            println!("    [{:?}] {}", judgment.met, judgment.criterion);
        }
        println!("  Exclusion criteria:");
        for judgment in &result.exclusion_criteria {
            println!("    [{:?}] {}", judgment.met, judgment.criterion);
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn sample_patients() -> Vec<Patient> {
    vec![
        Patient {
            id: "demo-1".to_string(),
            name: "John Smith".to_string(),
            gender: "Male".to_string(),
            birth_date: "1958-03-15".to_string(),
            conditions: vec![
                Condition {
                    name: "Non-small Cell Lung Cancer".to_string(),
                    code: Some("254637007".to_string()),
                },
                Condition {
                    name: "Hypertension".to_string(),
                    code: Some("38341003".to_string()),
                },
            ],
        },
        Patient {
            id: "demo-2".to_string(),
            name: "Sarah Johnson".to_string(),
            gender: "Female".to_string(),
            birth_date: "1969-02-03".to_string(),
            conditions: vec![Condition {
                name: "Breast Cancer".to_string(),
                code: Some("254837009".to_string()),
            }],
        },
        Patient {
            id: "demo-3".to_string(),
            name: "Robert Williams".to_string(),
            gender: "Male".to_string(),
            birth_date: "1945-11-22".to_string(),
            conditions: vec![
                Condition {
                    name: "Prostate Cancer".to_string(),
                    code: Some("399068003".to_string()),
                },
                Condition {
                    name: "Brain Metastases".to_string(),
                    code: Some("94225005".to_string()),
                },
            ],
        },
    ]
}

fn sample_trials() -> Vec<Trial> {
    vec![
        Trial {
            nct_id: "NCT05432814".to_string(),
            brief_title: "Targeted Therapy for Advanced Solid Tumors".to_string(),
            eligibility_criteria: "Inclusion Criteria:\n- Age \u{2265} 18 years\n- Histologically confirmed diagnosis of cancer\n\nExclusion Criteria:\n- Known brain metastases\n- Pregnant or breastfeeding".to_string(),
        },
        Trial {
            nct_id: "NCT05876230".to_string(),
            brief_title: "Immunotherapy Combination Study in Metastatic Cancer".to_string(),
            eligibility_criteria: "Inclusion Criteria:\n- Age \u{2265} 18 years\n- ECOG performance status \u{2264} 2\n\nExclusion Criteria:\n- Prior treatment with investigational agents within 4 weeks".to_string(),
        },
        Trial {
            nct_id: "NCT06011928".to_string(),
            brief_title: "Observational Registry of Cancer Outcomes".to_string(),
            eligibility_criteria: "Inclusion Criteria:\n- Adequate organ function\n- Ability to understand and provide informed consent".to_string(),
        },
    ]
}
