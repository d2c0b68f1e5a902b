use crate::cli::ServeArgs;
use crate::infra::{build_journey_service, AppState};
use crate::routes::with_journey_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use visa_journey::auth::TokenVerifier;
use visa_journey::config::AppConfig;
use visa_journey::error::AppError;
use visa_journey::telemetry;

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

    let journey_service = build_journey_service(config.journey);
    let verifier = TokenVerifier::new(&config.auth.jwt_secret);

    let app = with_journey_routes(journey_service)
        .layer(Extension(app_state))
        .layer(Extension(verifier))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        write_attempts = config.journey.write_attempts,
        "visa journey service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
