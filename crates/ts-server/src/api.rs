//! JSON HTTP handlers.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

use ts_scanner::StartOutcome;
use ts_types::alerts::AlertKind;
use ts_types::asset::RiskTier;
use ts_types::errors::{PolicyValidationError, StoreError};
use ts_types::policy::PolicyOverride;

use crate::AppState;

pub const DEFAULT_TOKEN_LIMIT: usize = 50;
pub const DEFAULT_ALERT_LIMIT: usize = 100;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Policy(#[from] PolicyValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) | ApiError::Policy(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(e) => {
                error!(error = %e, "store error while serving request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenQuery {
    pub limit: Option<usize>,
    pub risk_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertQuery {
    pub limit: Option<usize>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Parse an optional filter value; blank means no filter.
fn filter_param<T>(raw: Option<&str>) -> ApiResult<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => value.parse().map(Some).map_err(ApiError::BadRequest),
        None => Ok(None),
    }
}

/// GET /api/health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "timestamp": Utc::now().timestamp_millis() }))
}

/// GET /api/tokens?limit=&riskLevel=
pub async fn list_tokens(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<impl IntoResponse> {
    let tier: Option<RiskTier> = filter_param(query.risk_level.as_deref())?;
    let limit = query.limit.unwrap_or(DEFAULT_TOKEN_LIMIT);
    let assets = state.scanner.recent_assets(limit, tier).await?;
    Ok(Json(assets))
}

/// GET /api/tokens/:address
pub async fn get_token(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<impl IntoResponse> {
    match state.scanner.asset(&address).await? {
        Some(asset) => Ok(Json(asset)),
        None => Err(ApiError::NotFound("Token not found".to_string())),
    }
}

/// GET /api/alerts?limit=&type=
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertQuery>,
) -> ApiResult<impl IntoResponse> {
    let kind: Option<AlertKind> = filter_param(query.kind.as_deref())?;
    let limit = query.limit.unwrap_or(DEFAULT_ALERT_LIMIT);
    let alerts = state.scanner.recent_alerts(limit, kind).await?;
    Ok(Json(alerts))
}

/// GET /api/stats
pub async fn stats(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.scanner.stats().await?))
}

/// POST /api/scan/start with an optional JSON policy override.
pub async fn start_scan(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let patch: PolicyOverride = if body.iter().all(u8::is_ascii_whitespace) {
        PolicyOverride::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid filters: {e}")))?
    };

    let outcome = state.scanner.start_scan(&patch).await?;
    if outcome == StartOutcome::AlreadyRunning {
        info!("start requested while already scanning");
    }

    let status = state.scanner.status();
    Ok(Json(json!({
        "status": "scanning",
        "outcome": outcome,
        "filters": status.policy,
    })))
}

/// POST /api/scan/stop
pub async fn stop_scan(State(state): State<AppState>) -> impl IntoResponse {
    let was_running = state.scanner.stop_scan().await;
    Json(json!({ "status": "stopped", "wasRunning": was_running }))
}

/// GET /api/scan/status
pub async fn scan_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scanner.status())
}
