//! HTTP API for health checks, Prometheus metrics and incident management

use agent_lib::model::{ModelCache, ModelCacheStats};
use agent_lib::observability::render_metrics;
use agent_lib::store::MetricsStore;
use agent_lib::{
    ComponentStatus, HealthRegistry, HostHealth, Incident, IncidentId, IncidentManager,
    IncidentStatus, MetricSample, ResolveOutcome, SentinelError, TickReport, TickReportHandle,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_LIST_LIMIT: usize = 20;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health: HealthRegistry,
    pub reports: TickReportHandle,
    pub incidents: Arc<IncidentManager>,
    pub metrics_store: Arc<dyn MetricsStore>,
    pub models: Arc<ModelCache>,
}

/// Error body returned by every failing endpoint
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<SentinelError> for ApiError {
    fn from(err: SentinelError) -> Self {
        match err {
            SentinelError::InvalidIncidentId(_) => ApiError::BadRequest(err.to_string()),
            SentinelError::StoreUnavailable(_) => ApiError::Unavailable(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub health: HostHealth,
    pub report: Option<TickReport>,
    pub models: ModelCacheStats,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    #[serde(flatten)]
    pub outcome: ResolveOutcome,
    pub incident: Option<Incident>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct IncidentQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}

/// Health check response - returns 200 if operational, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 once the control loop runs
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let body = render_metrics().map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        body,
    ))
}

/// Host health from the newest stored sample plus the latest tick report
async fn report(State(state): State<Arc<AppState>>) -> Result<Json<ReportResponse>, ApiError> {
    let latest = state.metrics_store.recent(1)?;
    Ok(Json(ReportResponse {
        health: HostHealth::from_sample(latest.first()),
        report: state.reports.latest().await,
        models: state.models.stats(),
    }))
}

async fn recent_metrics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<MetricSample>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    Ok(Json(state.metrics_store.recent(limit)?))
}

async fn list_incidents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IncidentQuery>,
) -> Result<Json<Vec<Incident>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<IncidentStatus>)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);

    Ok(Json(state.incidents.list(status, Some(limit))?))
}

async fn get_incident(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Incident>, ApiError> {
    let id: IncidentId = id.parse()?;
    state
        .incidents
        .get(id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("incident {} not found", id)))
}

/// Resolve an incident; resolving twice reports the first resolution time
async fn resolve_incident(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let id: IncidentId = id.parse()?;
    let outcome = state.incidents.resolve(id)?;

    if let ResolveOutcome::NotFound = outcome {
        warn!(incident_id = %id, "Resolve requested for unknown incident");
        return Err(ApiError::NotFound(format!("incident {} not found", id)));
    }

    Ok(Json(ResolveResponse {
        outcome,
        incident: state.incidents.get(id)?,
    }))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/report", get(report))
        .route("/api/v1/metrics/recent", get(recent_metrics))
        .route("/api/v1/incidents", get(list_incidents))
        .route("/api/v1/incidents/:id", get(get_incident))
        .route("/api/v1/incidents/:id/resolve", post(resolve_incident))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
