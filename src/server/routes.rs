//! API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ServerState>`.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::analytics::{run_analytics, AnalyticsParams, ParamOverrides};
use crate::credentials::CredentialStore;
use crate::history::HistoryFetcher;
use crate::types::{AnalyticsResult, CrashRecord, GatewayError, HeaderBlob};

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "app-api-key";

const DEFAULT_LIMIT: i64 = 10;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ServerState {
    pub store: Arc<dyn CredentialStore>,
    pub fetcher: Arc<dyn HistoryFetcher>,
    pub api_key: SecretString,
    /// Parameters used when an analytics request omits them.
    pub defaults: AnalyticsParams,
}

pub type AppState = Arc<ServerState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HeadersPayload {
    pub headers: HeaderBlob,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsRequest {
    pub records: Vec<CrashRecord>,
    /// Applied over the server's configured defaults.
    #[serde(default)]
    pub params: ParamOverrides,
}

/// JSON error body: `{"error": ..., "details": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let status = match &err {
            GatewayError::Malformed(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Transport(_) | GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            error: err.to_string(),
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn authorize(state: &ServerState, headers: &HeaderMap) -> Result<(), ApiError> {
    let provided = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    match provided {
        Some(key) if !key.is_empty() && key == state.api_key.expose_secret() => Ok(()),
        _ => {
            warn!("Rejected request with missing or invalid API key");
            Err(ApiError::unauthorized())
        }
    }
}

/// Run a credential store call off the async workers; the file store
/// does blocking I/O.
async fn blocking_store<T, F>(store: &Arc<dyn CredentialStore>, op: F) -> Result<T, GatewayError>
where
    T: Send + 'static,
    F: FnOnce(&dyn CredentialStore) -> Result<T, GatewayError> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|e| GatewayError::Storage(format!("credential store task failed: {e}")))?
}

/// Parse a non-negative pagination bound.
fn parse_bound(raw: Option<&str>, default: i64) -> Option<u32> {
    let value = match raw {
        None => default,
        Some(s) => s.trim().parse::<i64>().ok()?,
    };
    u32::try_from(value).ok()
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/crash-history?limit=&offset=
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<CrashRecord>>, ApiError> {
    let (Some(limit), Some(offset)) = (
        parse_bound(query.limit.as_deref(), DEFAULT_LIMIT),
        parse_bound(query.offset.as_deref(), 0),
    ) else {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Invalid limit or offset."));
    };

    let headers = blocking_store(&state.store, |store| store.get()).await.map_err(|e| {
        error!(error = %e, "Failed to load stored headers");
        ApiError::from(e)
    })?;

    let records = state
        .fetcher
        .fetch_page(limit, offset, &headers)
        .await
        .map_err(|e| {
            error!(error = %e, limit, offset, "History fetch failed");
            ApiError::from(e)
        })?;

    info!(count = records.len(), limit, offset, "Served crash history");
    Ok(Json(records))
}

/// GET /api/crash-history/headers
pub async fn get_headers(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<HeadersPayload>, ApiError> {
    authorize(&state, &headers)?;
    let stored = blocking_store(&state.store, |store| store.get()).await?;
    Ok(Json(HeadersPayload { headers: stored }))
}

/// POST /api/crash-history/headers
pub async fn post_headers(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    authorize(&state, &headers)?;

    let payload: HeadersPayload = serde_json::from_slice(&body).map_err(|e| ApiError {
        details: Some(e.to_string()),
        ..ApiError::new(StatusCode::BAD_REQUEST, "Invalid or missing headers payload")
    })?;

    let blob = payload.headers;
    blocking_store(&state.store, move |store| store.put(&blob)).await.map_err(|e| {
        error!(error = %e, "Failed to store headers");
        ApiError::from(e)
    })?;

    Ok(Json(MessageResponse {
        message: "Headers encrypted and stored.".to_string(),
    }))
}

/// POST /api/analytics
pub async fn post_analytics(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AnalyticsResult>, ApiError> {
    let request: AnalyticsRequest = serde_json::from_slice(&body).map_err(|e| ApiError {
        details: Some(e.to_string()),
        ..ApiError::new(StatusCode::BAD_REQUEST, "Invalid analytics request")
    })?;

    let params = request.params.apply(&state.defaults);
    let result = run_analytics(&request.records, &params);
    info!(
        records = result.analysis.total_records,
        wins = result.analysis.total_wins,
        projected_profit_loss = result.projected_profit_loss,
        "Analytics computed"
    );
    Ok(Json(result))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
