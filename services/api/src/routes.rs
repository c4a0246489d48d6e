use crate::infra::AppState;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use trial_matcher::error::AppError;
use trial_matcher::matching::assessor::TrialAssessor;
use trial_matcher::matching::{AnalysisResult, BatchAnalyzer, Patient, Trial};
use trial_matcher::registry::{RegistryClient, StudyListing};

/// Shared state for the matching routes: the batch analyzer plus the
/// registry search client.
pub(crate) struct MatchingState<A> {
    pub(crate) analyzer: BatchAnalyzer<A>,
    pub(crate) registry: Arc<RegistryClient>,
}

impl<A> Clone for MatchingState<A> {
    fn clone(&self) -> Self {
        Self {
            analyzer: self.analyzer.clone(),
            registry: Arc::clone(&self.registry),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrialSearchParams {
    #[serde(default)]
    pub(crate) term: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TrialSearchResponse {
    pub(crate) studies: Vec<StudyListing>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalyzeEligibilityRequest {
    #[serde(default)]
    pub(crate) patient: Option<Patient>,
    #[serde(default)]
    pub(crate) trials: Option<Vec<Trial>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnalyzeEligibilityResponse {
    pub(crate) results: Vec<AnalysisResult>,
}

pub(crate) fn with_matching_routes<A>(state: MatchingState<A>) -> axum::Router
where
    A: TrialAssessor + 'static,
{
    axum::Router::new()
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/trials", axum::routing::get(search_trials_endpoint::<A>))
        .route(
            "/api/analyze-eligibility",
            axum::routing::post(analyze_eligibility_endpoint::<A>),
        )
        .with_state(state)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn search_trials_endpoint<A>(
    State(state): State<MatchingState<A>>,
    Query(params): Query<TrialSearchParams>,
) -> Result<Json<TrialSearchResponse>, AppError>
where
    A: TrialAssessor + 'static,
{
    let term = params
        .term
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Search term is required".to_string()))?;

    let studies = state.registry.search(term).await;
    Ok(Json(TrialSearchResponse { studies }))
}

// The body is taken as raw JSON and validated by hand: a wrong-typed
// `patient` or `trials` field must surface as a 400, not as the extractor's
// 422 rejection.
pub(crate) async fn analyze_eligibility_endpoint<A>(
    State(state): State<MatchingState<A>>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<AnalyzeEligibilityResponse>, AppError>
where
    A: TrialAssessor + 'static,
{
    let request: AnalyzeEligibilityRequest = serde_json::from_value(payload)
        .map_err(|err| AppError::InvalidRequest(format!("Invalid patient data or trials: {err}")))?;

    let (Some(patient), Some(trials)) = (request.patient, request.trials) else {
        return Err(AppError::InvalidRequest(
            "Missing patient data or trials".to_string(),
        ));
    };

    let results = state.analyzer.analyze(&patient, &trials).await;
    Ok(Json(AnalyzeEligibilityResponse { results }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use trial_matcher::config::RegistryConfig;
    use trial_matcher::matching::assessor::MockAssessor;
    use trial_matcher::matching::Condition;

    fn test_state() -> MatchingState<MockAssessor> {
        let registry_config = RegistryConfig {
            base_url: "https://registry.invalid/api/v2".to_string(),
            page_size: 5,
            status_filter: None,
            timeout_secs: 1,
        };
        MatchingState {
            analyzer: BatchAnalyzer::new(Arc::new(MockAssessor::new())),
            registry: Arc::new(RegistryClient::new(&registry_config).expect("client builds")),
        }
    }

    fn sample_patient() -> Patient {
        Patient {
            id: "patient-1".to_string(),
            name: "John Smith".to_string(),
            gender: "Male".to_string(),
            birth_date: "1958-03-15".to_string(),
            conditions: vec![Condition {
                name: "Non-small Cell Lung Cancer".to_string(),
                code: None,
            }],
        }
    }

    fn sample_trials() -> Vec<Trial> {
        vec![
            Trial {
                nct_id: "NCT001".to_string(),
                brief_title: "Study A".to_string(),
                eligibility_criteria: "Inclusion Criteria:\n- Age 18 or older".to_string(),
            },
            Trial {
                nct_id: "NCT002".to_string(),
                brief_title: "Study B".to_string(),
                eligibility_criteria: String::new(),
            },
        ]
    }

    #[tokio::test]
    async fn analyze_endpoint_returns_one_result_per_trial() {
        let Json(body) = analyze_eligibility_endpoint(
            State(test_state()),
            Json(json!({ "patient": sample_patient(), "trials": sample_trials() })),
        )
        .await
        .expect("analysis succeeds");

        assert_eq!(body.results.len(), 2);
        assert!(body.results.iter().all(|result| result.score.is_some()));
    }

    #[tokio::test]
    async fn analyze_endpoint_rejects_missing_patient() {
        let err = analyze_eligibility_endpoint(
            State(test_state()),
            Json(json!({ "trials": sample_trials() })),
        )
        .await
        .expect_err("must fail");

        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn analyze_endpoint_rejects_missing_trials() {
        let err = analyze_eligibility_endpoint(
            State(test_state()),
            Json(json!({ "patient": sample_patient() })),
        )
        .await
        .expect_err("must fail");

        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn analyze_endpoint_rejects_wrong_typed_trials() {
        let err = analyze_eligibility_endpoint(
            State(test_state()),
            Json(json!({ "patient": sample_patient(), "trials": "not-an-array" })),
        )
        .await
        .expect_err("must fail");

        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn analyze_route_returns_400_for_wrong_typed_body() {
        let app = with_matching_routes(test_state());
        let body = json!({ "patient": { "id": "p1" }, "trials": "not-an-array" });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/analyze-eligibility")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn search_endpoint_requires_a_term() {
        let err = search_trials_endpoint(
            State(test_state()),
            Query(TrialSearchParams {
                term: Some("   ".to_string()),
            }),
        )
        .await
        .expect_err("must fail");

        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn analyze_route_rejects_non_post_methods() {
        let app = with_matching_routes(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/analyze-eligibility")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn health_route_is_wired() {
        let app = with_matching_routes(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
    }
}
