//! User-entered settings: persistence, JSON export/import, and resolution of
//! the effective configuration for one request.

pub mod handlers;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{unescape_newlines, Config};
use crate::delivery::google_docs::GoogleCredentials;
use crate::delivery::SmtpSettings;
use crate::errors::AppError;
use crate::models::seo_form::OpenRouterOverride;
use crate::storage::{KeyValueStore, StoreError};

const SETTINGS_KEY: &str = "settings";
/// Bumped when the exported JSON shape changes.
pub const EXPORT_FORMAT_VERSION: u32 = 2;

const REQUIRED_IMPORT_FIELDS: &[&str] = &[
    "openrouter_api_key",
    "openrouter_model",
    "smtp_host",
    "smtp_user",
    "smtp_password",
    "from_email",
];
const EXPORT_METADATA_FIELDS: &[&str] = &["id", "exported_at", "version"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub openrouter_api_key: String,
    pub openrouter_model: String,
    pub smtp_host: String,
    pub smtp_port: Option<u16>,
    pub smtp_user: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
    pub google_client_email: String,
    pub google_private_key: String,
    pub google_project_id: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Replaces the stored settings and stamps `updated_at`.
pub fn save_settings(
    store: &dyn KeyValueStore,
    settings: &AppSettings,
) -> Result<AppSettings, StoreError> {
    let mut saved = settings.clone();
    saved.updated_at = Some(Utc::now());
    store.put(SETTINGS_KEY, &serde_json::to_vec(&saved)?)?;
    Ok(saved)
}

pub fn get_settings(store: &dyn KeyValueStore) -> Result<Option<AppSettings>, StoreError> {
    store
        .get(SETTINGS_KEY)?
        .map(|bytes| serde_json::from_slice(&bytes))
        .transpose()
        .map_err(StoreError::from)
}

/// Pretty JSON of the stored settings plus export metadata.
pub fn export_settings(store: &dyn KeyValueStore) -> Result<String, AppError> {
    let settings = get_settings(store)?
        .ok_or_else(|| AppError::NotFound("No settings found to export".to_string()))?;

    let mut value = serde_json::to_value(&settings).map_err(StoreError::from)?;
    if let Value::Object(map) = &mut value {
        map.insert("exported_at".to_string(), Value::String(Utc::now().to_rfc3339()));
        map.insert("version".to_string(), Value::from(EXPORT_FORMAT_VERSION));
    }

    Ok(serde_json::to_string_pretty(&value).map_err(StoreError::from)?)
}

/// Validates and stores settings from an exported JSON document.
pub fn import_settings(store: &dyn KeyValueStore, json: &str) -> Result<AppSettings, AppError> {
    let mut value: Value = serde_json::from_str(json)
        .map_err(|e| AppError::Validation(format!("Failed to import settings: {e}")))?;

    let map = value.as_object_mut().ok_or_else(|| {
        AppError::Validation("Failed to import settings: expected a JSON object".to_string())
    })?;

    for field in REQUIRED_IMPORT_FIELDS {
        let present = map
            .get(*field)
            .and_then(Value::as_str)
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false);
        if !present {
            return Err(AppError::Validation(format!(
                "Failed to import settings: missing required field: {field}"
            )));
        }
    }

    for field in EXPORT_METADATA_FIELDS {
        map.remove(*field);
    }

    let settings: AppSettings = serde_json::from_value(value)
        .map_err(|e| AppError::Validation(format!("Failed to import settings: {e}")))?;

    Ok(save_settings(store, &settings)?)
}

// ────────────────────────────────────────────────────────────────────────────
// Effective settings
// ────────────────────────────────────────────────────────────────────────────

/// The configuration one request runs with, after applying precedence.
#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    pub openrouter_api_key: Option<String>,
    pub openrouter_model: String,
    pub smtp: Option<SmtpSettings>,
    pub google: Option<GoogleCredentials>,
    pub drive_folder_id: Option<String>,
    pub skip_google_apis: bool,
}

/// OpenRouter: request override, then stored settings, then environment.
/// SMTP and Google: stored settings, then environment.
pub fn resolve(
    config: &Config,
    stored: Option<&AppSettings>,
    request_override: Option<&OpenRouterOverride>,
) -> EffectiveSettings {
    let override_key = request_override
        .and_then(|o| o.api_key.clone())
        .filter(|k| !k.trim().is_empty());
    let override_model = request_override
        .and_then(|o| o.model.clone())
        .filter(|m| !m.trim().is_empty());

    let openrouter_api_key = override_key
        .or_else(|| non_empty(stored.map(|s| &s.openrouter_api_key)))
        .or_else(|| config.openrouter_api_key.clone());
    let openrouter_model = override_model
        .or_else(|| non_empty(stored.map(|s| &s.openrouter_model)))
        .unwrap_or_else(|| config.openrouter_model.clone());

    let smtp = (|| {
        Some(SmtpSettings {
            host: non_empty(stored.map(|s| &s.smtp_host)).or_else(|| config.smtp.host.clone())?,
            port: stored
                .and_then(|s| s.smtp_port)
                .unwrap_or(config.smtp.port),
            user: non_empty(stored.map(|s| &s.smtp_user)).or_else(|| config.smtp.user.clone())?,
            password: non_empty(stored.map(|s| &s.smtp_password))
                .or_else(|| config.smtp.password.clone())?,
            from_email: non_empty(stored.map(|s| &s.from_email))
                .or_else(|| config.smtp.from_email.clone())?,
            from_name: non_empty(stored.map(|s| &s.from_name))
                .unwrap_or_else(|| config.smtp.from_name.clone()),
        })
    })();

    let google = (|| {
        Some(GoogleCredentials {
            client_email: non_empty(stored.map(|s| &s.google_client_email))
                .or_else(|| config.google.client_email.clone())?,
            private_key: non_empty(stored.map(|s| &s.google_private_key))
                .map(|k| unescape_newlines(&k))
                .or_else(|| config.google.private_key.clone())?,
            project_id: non_empty(stored.map(|s| &s.google_project_id))
                .or_else(|| config.google.project_id.clone()),
        })
    })();

    EffectiveSettings {
        openrouter_api_key,
        openrouter_model,
        smtp,
        google,
        drive_folder_id: config.google.drive_folder_id.clone(),
        skip_google_apis: config.skip_google_apis,
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}
