use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::{with_matching_routes, MatchingState};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};
use trial_matcher::config::AppConfig;
use trial_matcher::error::AppError;
use trial_matcher::matching::assessor::{LlmAssessor, MockAssessor, OpenAiChatClient};
use trial_matcher::matching::{BatchAnalyzer, BatchOptions};
use trial_matcher::registry::RegistryClient;
use trial_matcher::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let registry = Arc::new(RegistryClient::new(&config.registry)?);
    let options = BatchOptions::from(&config.matching);

    let app = if config.assessor.api_key.is_some() {
        let client = OpenAiChatClient::new(&config.assessor).map_err(AppError::Assessor)?;
        let assessor =
            LlmAssessor::new(client).with_temperature(config.assessor.temperature);
        with_matching_routes(MatchingState {
            analyzer: BatchAnalyzer::with_options(Arc::new(assessor), options),
            registry,
        })
    } else {
        warn!("OPENAI_API_KEY is not set; serving with the mock assessor");
        with_matching_routes(MatchingState {
            analyzer: BatchAnalyzer::with_options(Arc::new(MockAssessor::new()), options),
            registry,
        })
    };

    let app = app.layer(Extension(app_state)).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "clinical trial matcher ready");

    axum::serve(listener, app).await?;
    Ok(())
}
