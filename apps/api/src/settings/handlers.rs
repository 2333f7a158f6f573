//! Axum route handlers for settings management.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::errors::AppError;
use crate::settings::{export_settings, get_settings, import_settings, save_settings, AppSettings};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub settings: Option<AppSettings>,
}

#[derive(Debug, Serialize)]
pub struct SavedSettingsResponse {
    pub success: bool,
    pub message: String,
    pub settings: AppSettings,
}

/// GET /api/settings
pub async fn handle_get_settings(
    State(state): State<AppState>,
) -> Result<Json<SettingsResponse>, AppError> {
    let settings = get_settings(state.store.as_ref())?;
    Ok(Json(SettingsResponse { settings }))
}

/// PUT /api/settings
pub async fn handle_save_settings(
    State(state): State<AppState>,
    Json(settings): Json<AppSettings>,
) -> Result<Json<SavedSettingsResponse>, AppError> {
    let settings = save_settings(state.store.as_ref(), &settings)?;
    tracing::info!("Settings saved");
    Ok(Json(SavedSettingsResponse {
        success: true,
        message: "Settings saved".to_string(),
        settings,
    }))
}

/// GET /api/settings/export
///
/// Returns the settings as a downloadable JSON file.
pub async fn handle_export_settings(State(state): State<AppState>) -> Result<Response, AppError> {
    let json = export_settings(state.store.as_ref())?;
    let disposition = format!(
        "attachment; filename=\"seo-settings-{}.json\"",
        Utc::now().format("%Y-%m-%d")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        json,
    )
        .into_response())
}

/// POST /api/settings/import
///
/// Body is the exported JSON document as-is.
pub async fn handle_import_settings(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<SavedSettingsResponse>, AppError> {
    let settings = import_settings(state.store.as_ref(), &body)?;
    tracing::info!("Settings imported");
    Ok(Json(SavedSettingsResponse {
        success: true,
        message: "Settings imported".to_string(),
        settings,
    }))
}
