//! Axum route handlers for the submission history.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::history::{clear_logs, get_logs, LogEntry, DEFAULT_LOG_LIMIT};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<LogEntry>,
}

#[derive(Debug, Serialize)]
pub struct ClearLogsResponse {
    pub success: bool,
    pub removed: usize,
}

/// GET /api/logs?limit=N
pub async fn handle_get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    let logs = get_logs(state.store.as_ref(), limit)?;
    Ok(Json(LogsResponse { logs }))
}

/// DELETE /api/logs
pub async fn handle_clear_logs(
    State(state): State<AppState>,
) -> Result<Json<ClearLogsResponse>, AppError> {
    let removed = clear_logs(state.store.as_ref())?;
    tracing::info!("Cleared {removed} history entries");
    Ok(Json(ClearLogsResponse {
        success: true,
        removed,
    }))
}
