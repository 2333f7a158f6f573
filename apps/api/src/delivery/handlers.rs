//! Axum route handlers for the delivery connection tests.
//!
//! Both endpoints accept credentials in the body so the settings page can test
//! values before saving them; missing fields fall back to the effective settings.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::config::unescape_newlines;
use crate::delivery::email::send_test_email;
use crate::delivery::google_docs::{test_google_access, GoogleCredentials};
use crate::delivery::SmtpSettings;
use crate::errors::AppError;
use crate::models::responses::StatusResponse;
use crate::settings::{get_settings, resolve, EffectiveSettings};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TestEmailRequest {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub from_email: Option<String>,
    pub from_name: Option<String>,
    /// Defaults to the SMTP user.
    pub test_email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TestGoogleRequest {
    pub google_client_email: Option<String>,
    pub google_private_key: Option<String>,
    pub google_project_id: Option<String>,
}

fn given(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Body values over effective settings. Returns the account and the test recipient.
fn smtp_for_test(
    request: TestEmailRequest,
    settings: &EffectiveSettings,
    default_port: u16,
    default_from_name: &str,
) -> Result<(SmtpSettings, String), AppError> {
    let base = settings.smtp.as_ref();
    let incomplete =
        || AppError::Validation("Email configuration is incomplete: host, user, password and from_email are required".to_string());

    let smtp = SmtpSettings {
        host: given(request.smtp_host)
            .or_else(|| base.map(|b| b.host.clone()))
            .ok_or_else(incomplete)?,
        port: request
            .smtp_port
            .or_else(|| base.map(|b| b.port))
            .unwrap_or(default_port),
        user: given(request.smtp_user)
            .or_else(|| base.map(|b| b.user.clone()))
            .ok_or_else(incomplete)?,
        password: given(request.smtp_password)
            .or_else(|| base.map(|b| b.password.clone()))
            .ok_or_else(incomplete)?,
        from_email: given(request.from_email)
            .or_else(|| base.map(|b| b.from_email.clone()))
            .ok_or_else(incomplete)?,
        from_name: given(request.from_name)
            .or_else(|| base.map(|b| b.from_name.clone()))
            .unwrap_or_else(|| default_from_name.to_string()),
    };
    let to = given(request.test_email).unwrap_or_else(|| smtp.user.clone());
    Ok((smtp, to))
}

fn google_for_test(
    request: TestGoogleRequest,
    settings: &EffectiveSettings,
) -> Result<GoogleCredentials, AppError> {
    let base = settings.google.as_ref();
    let credentials = GoogleCredentials {
        client_email: given(request.google_client_email)
            .or_else(|| base.map(|b| b.client_email.clone()))
            .ok_or_else(|| {
                AppError::Validation("Google client email is required".to_string())
            })?,
        private_key: given(request.google_private_key)
            .map(|k| unescape_newlines(&k))
            .or_else(|| base.map(|b| b.private_key.clone()))
            .ok_or_else(|| AppError::Validation("Google private key is required".to_string()))?,
        project_id: given(request.google_project_id)
            .or_else(|| base.and_then(|b| b.project_id.clone())),
    };

    if !credentials.is_service_account() {
        return Err(AppError::Validation(
            "Google client email must be a service account (name@project.iam.gserviceaccount.com)"
                .to_string(),
        ));
    }
    if !credentials.private_key.contains("BEGIN PRIVATE KEY")
        || !credentials.private_key.contains("END PRIVATE KEY")
    {
        return Err(AppError::Validation(
            "Google private key is not a PEM private key".to_string(),
        ));
    }
    Ok(credentials)
}

/// POST /api/test-email
pub async fn handle_test_email(
    State(state): State<AppState>,
    Json(request): Json<TestEmailRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let stored = get_settings(state.store.as_ref())?;
    let settings = resolve(&state.config, stored.as_ref(), None);
    let (smtp, to) = smtp_for_test(
        request,
        &settings,
        state.config.smtp.port,
        &state.config.smtp.from_name,
    )?;

    send_test_email(&smtp, &to).await?;
    Ok(Json(StatusResponse::ok(format!("Test email sent to {to}"))))
}

/// POST /api/test-google-apis
pub async fn handle_test_google(
    State(state): State<AppState>,
    Json(request): Json<TestGoogleRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let stored = get_settings(state.store.as_ref())?;
    let settings = resolve(&state.config, stored.as_ref(), None);
    let credentials = google_for_test(request, &settings)?;

    tracing::info!(
        "Testing Google APIs as {} (project {})",
        credentials.client_email,
        credentials.project_id.as_deref().unwrap_or("unset")
    );
    test_google_access(state.http.clone(), &credentials).await?;
    Ok(Json(StatusResponse::ok(
        "Google APIs are working: document created and deleted",
    )))
}
