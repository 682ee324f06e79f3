use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::dashboard_router;
use agenda_report::config::AppConfig;
use agenda_report::error::AppError;
use agenda_report::ingest::RecordCache;
use agenda_report::scheduling::SystemClock;
use agenda_report::telemetry;
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
    if let Some(directory) = args.data_dir.take() {
        config.data.directory = directory;
    }

    telemetry::init(&config.telemetry)?;

    // A directory that cannot be loaded keeps the service from starting.
    let records = Arc::new(RecordCache::new(config.data.directory.clone()));
    let loaded = records.get_or_load()?;
    info!(
        directory = %records.directory().display(),
        records = loaded.len(),
        files = loaded.files().len(),
        undated = loaded.undated(),
        "spreadsheets loaded"
    );

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        records,
        clock: Arc::new(SystemClock),
    };

    let app = dashboard_router(app_state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "scheduling dashboard ready");

    axum::serve(listener, app).await?;
    Ok(())
}
