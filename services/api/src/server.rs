use crate::cli::ServeArgs;
use crate::infra::{load_directory, AppState};
use crate::routes::with_classroom_routes;
use academy::classroom::{ClassroomDeps, ClassroomService};
use academy::config::AppConfig;
use academy::error::AppError;
use academy::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
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
    if let Some(path) = args.directory_csv.take() {
        config.directory_csv = Some(path);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let directory = load_directory(config.directory_csv.as_deref())?;
    let classroom_service = Arc::new(ClassroomService::new(
        ClassroomDeps::in_memory(Arc::new(directory)),
        config.classroom,
    ));

    let app = with_classroom_routes(classroom_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        allow_empty_roster = config.classroom.allow_empty_roster,
        max_write_attempts = config.classroom.max_write_attempts,
        "academy classroom service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
