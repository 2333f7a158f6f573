//! Axum route handlers for the SEO generation API.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::delivery::{deliver, DeliveryReport, DeliveryRequest};
use crate::errors::AppError;
use crate::generation::orchestrator::{run_generation, GenerationRequest};
use crate::generation::validator::{AnalysisSummary, ValidationOutcome};
use crate::history::{add_log, LogEntry, LogStatus};
use crate::llm_client::LlmClient;
use crate::models::responses::StatusResponse;
use crate::models::seo_form::{OpenRouterOverride, SeoFormData};
use crate::settings::{get_settings, resolve, EffectiveSettings};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SeoFormResponse {
    pub success: bool,
    pub message: String,
    pub model: String,
    pub content: String,
    pub word_count: usize,
    pub attempts_used: u32,
    pub all_satisfied: bool,
    pub summary: AnalysisSummary,
    pub outcomes: Vec<ValidationOutcome>,
    pub delivery: DeliveryReport,
}

#[derive(Debug, Default, Deserialize)]
pub struct TestOpenRouterRequest {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/seo-onpage-form
///
/// Validates the form, generates constraint-checked content, delivers it by
/// email and records the outcome in the history log. Bodies that do not parse
/// as a form are rejected with the same error envelope and logged too.
pub async fn handle_seo_form(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SeoFormResponse>, AppError> {
    let stored = get_settings(state.store.as_ref())?;

    let form = match parse_form(payload) {
        Ok(form) => form,
        Err((body, error)) => {
            let request_override = body
                .get("_openrouter_settings")
                .and_then(|v| serde_json::from_value::<OpenRouterOverride>(v.clone()).ok());
            let settings = resolve(&state.config, stored.as_ref(), request_override.as_ref());
            warn!("Rejected SEO form: {error}");
            record(
                &state,
                &LogEntry::from_raw(&body, &settings.openrouter_model, error.to_string()),
            );
            return Err(error);
        }
    };
    let settings = resolve(&state.config, stored.as_ref(), form.openrouter_settings.as_ref());

    let result = process_submission(&state, &form, &settings).await;

    let entry = match &result {
        Ok(_) => LogEntry::for_submission(&form, &settings.openrouter_model, LogStatus::Success, None),
        Err(e) => LogEntry::for_submission(
            &form,
            &settings.openrouter_model,
            LogStatus::Error,
            Some(e.to_string()),
        ),
    };
    record(&state, &entry);

    result.map(Json)
}

/// On failure returns whatever JSON was readable (`Null` for a malformed body)
/// with the validation error.
fn parse_form(payload: Result<Json<Value>, JsonRejection>) -> Result<SeoFormData, (Value, AppError)> {
    match payload {
        Ok(Json(body)) => match serde_json::from_value::<SeoFormData>(body.clone()) {
            Ok(form) => Ok(form),
            Err(e) => Err((body, AppError::Validation(format!("Invalid form data: {e}")))),
        },
        Err(rejection) => Err((
            Value::Null,
            AppError::Validation(format!("Invalid form data: {}", rejection.body_text())),
        )),
    }
}

fn record(state: &AppState, entry: &LogEntry) {
    if let Err(e) = add_log(state.store.as_ref(), entry) {
        warn!("Failed to record history entry: {e}");
    }
}

async fn process_submission(
    state: &AppState,
    form: &SeoFormData,
    settings: &EffectiveSettings,
) -> Result<SeoFormResponse, AppError> {
    if let Some(first) = form.validation_errors().into_iter().next() {
        return Err(AppError::Validation(first));
    }

    let api_key = settings.openrouter_api_key.clone().ok_or_else(|| {
        AppError::Validation(
            "OpenRouter API key is not configured. Add it in Settings or set OPENROUTER_API_KEY"
                .to_string(),
        )
    })?;
    let llm = LlmClient::new(state.http.clone(), api_key, state.config.app_url.clone())?;

    info!(
        "SEO form accepted: \"{}\" for {} ({} keywords, {}, model {})",
        form.page_title,
        form.website_name,
        form.keywords_links.len(),
        form.content_length.as_str(),
        settings.openrouter_model
    );

    let request = GenerationRequest::from_form(form, &settings.openrouter_model);
    let generated = run_generation(&llm, &request).await?;

    let delivery = deliver(
        &state.http,
        settings,
        &DeliveryRequest {
            recipient: form.recipient_email.trim(),
            website_name: &request.website_name,
            page_title: &request.page_title,
            content: &generated.final_content,
        },
    )
    .await?;

    info!(
        "Delivered \"{}\" to {} ({:?})",
        request.page_title, form.recipient_email, delivery.mode
    );

    Ok(SeoFormResponse {
        success: true,
        message: format!("{}\nSent to {}", generated.message, form.recipient_email.trim()),
        model: settings.openrouter_model.clone(),
        content: generated.final_content,
        word_count: generated.word_count,
        attempts_used: generated.attempts_used,
        all_satisfied: generated.all_satisfied,
        summary: generated.summary,
        outcomes: generated.outcomes,
        delivery,
    })
}

/// POST /api/test-openrouter
///
/// Checks a key/model pair with a tiny completion. Missing fields fall back to
/// the stored settings and then the environment.
pub async fn handle_test_openrouter(
    State(state): State<AppState>,
    Json(request): Json<TestOpenRouterRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let stored = get_settings(state.store.as_ref())?;
    let request_override = OpenRouterOverride {
        api_key: request.api_key,
        model: request.model,
    };
    let settings = resolve(&state.config, stored.as_ref(), Some(&request_override));

    let api_key = settings
        .openrouter_api_key
        .ok_or_else(|| AppError::Validation("API key is required".to_string()))?;
    let llm = LlmClient::new(state.http.clone(), api_key, state.config.app_url.clone())?;

    let reply = llm.test_connection(&settings.openrouter_model).await?;
    info!("OpenRouter connection test passed (model {})", settings.openrouter_model);

    Ok(Json(StatusResponse::ok(format!(
        "Connected to OpenRouter with model {}. Reply: {}",
        settings.openrouter_model,
        reply.trim()
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unparseable_form_keeps_raw_body() {
        let body = serde_json::json!({ "website_name": "Acme", "keywords_links": [] });
        match parse_form(Ok(Json(body.clone()))) {
            Err((raw, AppError::Validation(message))) => {
                assert_eq!(raw, body);
                assert!(message.starts_with("Invalid form data: missing field"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_openrouter_request_fields_are_optional() {
        let request: TestOpenRouterRequest = serde_json::from_str("{}").unwrap();
        assert!(request.api_key.is_none());
        assert!(request.model.is_none());
    }
}
