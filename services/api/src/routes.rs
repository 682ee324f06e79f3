use crate::infra::{selection_from_query, AppState};
use crate::page::render_dashboard;
use agenda_report::error::AppError;
use agenda_report::ingest::{IngestError, RecordCache, RecordSet};
use agenda_report::scheduling::export::{export_mime, to_csv_bytes, EXPORT_FILE_NAME};
use agenda_report::scheduling::filters::filter_records;
use agenda_report::scheduling::{build_report, DashboardReport, FilterSelection};
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

type QueryPairs = Query<Vec<(String, String)>>;

pub(crate) fn dashboard_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard_page))
        .route("/api/v1/dashboard", get(dashboard_endpoint))
        .route("/api/v1/export", get(export_endpoint))
        .route("/api/v1/records/refresh", post(refresh_endpoint))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .layer(Extension(state))
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

/// Runs a cache operation on the blocking pool. Reloads scan the directory
/// and parse every workbook while holding the cache lock.
async fn with_records<F>(state: &AppState, operation: F) -> Result<Arc<RecordSet>, AppError>
where
    F: FnOnce(&RecordCache) -> Result<Arc<RecordSet>, IngestError> + Send + 'static,
{
    let cache = Arc::clone(&state.records);
    let records = tokio::task::spawn_blocking(move || operation(&cache))
        .await
        .map_err(|err| AppError::Io(std::io::Error::other(err)))??;
    Ok(records)
}

/// Parses the query and loads the current record set. The cache reloads on
/// its own when the spreadsheet directory changed since the last request.
async fn load_selection(
    state: &AppState,
    params: &[(String, String)],
) -> Result<(FilterSelection, Arc<RecordSet>), AppError> {
    let selection = selection_from_query(params)?;
    let records = with_records(state, RecordCache::get_or_load).await?;
    Ok((selection, records))
}

pub(crate) async fn dashboard_page(
    Extension(state): Extension<AppState>,
    Query(params): QueryPairs,
) -> Result<Html<String>, AppError> {
    let (selection, records) = load_selection(&state, &params).await?;
    let report = build_report(records.records(), &selection, state.clock.as_ref());
    Ok(Html(render_dashboard(&report, &records)))
}

pub(crate) async fn dashboard_endpoint(
    Extension(state): Extension<AppState>,
    Query(params): QueryPairs,
) -> Result<Json<DashboardReport>, AppError> {
    let (selection, records) = load_selection(&state, &params).await?;
    Ok(Json(build_report(
        records.records(),
        &selection,
        state.clock.as_ref(),
    )))
}

pub(crate) async fn export_endpoint(
    Extension(state): Extension<AppState>,
    Query(params): QueryPairs,
) -> Result<impl IntoResponse, AppError> {
    let (selection, records) = load_selection(&state, &params).await?;
    let filtered = filter_records(records.records(), &selection);
    let body = to_csv_bytes(&filtered.records)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, export_mime().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
            ),
        ],
        body,
    ))
}

pub(crate) async fn refresh_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let records = with_records(&state, RecordCache::refresh).await?;
    info!(
        records = records.len(),
        files = records.files().len(),
        "record cache refreshed"
    );
    Ok(Json(json!({
        "records": records.len(),
        "files": records.files().len(),
        "undated": records.undated(),
    })))
}
