use crate::cli::ServeArgs;
use crate::infra::{in_memory_intake, seed_agent, AppState};
use crate::routes::application;
use axum_prometheus::PrometheusMetricLayer;
use finflow::config::AppConfig;
use finflow::error::AppError;
use finflow::telemetry;
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

    let intake = in_memory_intake(&config.sessions);
    seed_agent(&intake, &config.agents)?;

    let app = application(Arc::new(intake), app_state, config.server.max_body_bytes)
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "finflow intake api ready");

    axum::serve(listener, app).await?;
    Ok(())
}
