use crate::cli::ServeArgs;
use crate::infra::{AppState, CreditService};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use credit_approval::config::AppConfig;
use credit_approval::error::AppError;
use credit_approval::telemetry;
use credit_approval::workflows::credit::HttpDecisionServices;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let decision_services = Arc::new(HttpDecisionServices::new(config.collaborators.clone())?);
    let credit_service: Arc<CreditService> = Arc::new(
        CreditService::new(decision_services)
            .with_idle_timeout(config.server.session_idle_timeout()),
    );

    let app = with_operational_routes(credit_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        risk_scoring = %config.collaborators.risk_scoring_url,
        "credit approval service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
