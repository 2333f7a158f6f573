pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::delivery::handlers as delivery;
use crate::generation::handlers as generation;
use crate::history::handlers as history;
use crate::settings::handlers as settings;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Generation
        .route("/api/seo-onpage-form", post(generation::handle_seo_form))
        .route(
            "/api/test-openrouter",
            post(generation::handle_test_openrouter),
        )
        // Delivery checks
        .route("/api/test-email", post(delivery::handle_test_email))
        .route("/api/test-google-apis", post(delivery::handle_test_google))
        // Settings
        .route(
            "/api/settings",
            get(settings::handle_get_settings).put(settings::handle_save_settings),
        )
        .route(
            "/api/settings/export",
            get(settings::handle_export_settings),
        )
        .route(
            "/api/settings/import",
            post(settings::handle_import_settings),
        )
        // History
        .route(
            "/api/logs",
            get(history::handle_get_logs).delete(history::handle_clear_logs),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::history::{add_log, get_logs, LogEntry, LogStatus};
    use crate::models::seo_form::tests::valid_form;
    use crate::settings::tests::full_settings;
    use crate::storage::SledStore;

    fn test_state() -> AppState {
        AppState {
            store: Arc::new(SledStore::temporary().unwrap()),
            http: reqwest::Client::new(),
            config: Config::for_tests(),
        }
    }

    async fn send(state: &AppState, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = build_router(state.clone())
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let state = test_state();
        let (status, body) = send(&state, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_invalid_form_is_rejected_and_logged() {
        let state = test_state();
        let mut form = serde_json::to_value(valid_form()).unwrap();
        form["website_description"] = json!("short");

        let (status, body) = send(&state, Method::POST, "/api/seo-onpage-form", Some(form)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("website_description"));

        let logs = get_logs(state.store.as_ref(), 10).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, LogStatus::Error);
    }

    #[tokio::test]
    async fn test_form_without_api_key_is_rejected() {
        let state = test_state();
        let form = serde_json::to_value(valid_form()).unwrap();

        let (status, body) = send(&state, Method::POST, "/api/seo-onpage-form", Some(form)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("OpenRouter API key"));
    }

    #[tokio::test]
    async fn test_form_with_malformed_key_is_rejected_before_any_call() {
        let state = test_state();
        let mut form = serde_json::to_value(valid_form()).unwrap();
        form["_openrouter_settings"] = json!({ "api_key": "not-a-key" });

        let (status, body) = send(&state, Method::POST, "/api/seo-onpage-form", Some(form)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_API_KEY");
    }

    #[tokio::test]
    async fn test_unknown_content_length_is_rejected() {
        let state = test_state();
        let mut form = serde_json::to_value(valid_form()).unwrap();
        form["content_length"] = json!("huge");

        let (status, body) = send(&state, Method::POST, "/api/seo-onpage-form", Some(form)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_missing_field_and_negative_frequency_are_rejected_and_logged() {
        let state = test_state();
        let mut form = serde_json::to_value(valid_form()).unwrap();
        form.as_object_mut().unwrap().remove("page_title");
        form["keywords_links"][0]["frequency"] = json!(-1);

        let (status, body) = send(&state, Method::POST, "/api/seo-onpage-form", Some(form)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid form data"));

        let logs = get_logs(state.store.as_ref(), 10).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, LogStatus::Error);
        assert_eq!(logs[0].website_name, "Acme Coffee");
        assert_eq!(logs[0].keywords_count, 2);
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected_and_logged() {
        let state = test_state();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/seo-onpage-form")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"website_name\": "))
            .unwrap();
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let logs = get_logs(state.store.as_ref(), 10).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, LogStatus::Error);
    }

    #[tokio::test]
    async fn test_openrouter_test_rejects_demo_key() {
        let state = test_state();
        let (status, body) = send(
            &state,
            Method::POST,
            "/api/test-openrouter",
            Some(json!({ "api_key": "sk-or-v1-demo" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_API_KEY");
    }

    #[tokio::test]
    async fn test_email_test_requires_configuration() {
        let state = test_state();
        let (status, _) = send(&state, Method::POST, "/api/test-email", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_settings_save_get_export_import() {
        let state = test_state();

        let (status, body) = send(&state, Method::GET, "/api/settings", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["settings"].is_null());

        let (status, _) = send(&state, Method::GET, "/api/settings/export", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let settings = serde_json::to_value(full_settings()).unwrap();
        let (status, body) = send(&state, Method::PUT, "/api/settings", Some(settings)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["settings"]["updated_at"].is_string());

        let (status, exported) = send(&state, Method::GET, "/api/settings/export", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(exported["version"].is_number());

        let other = test_state();
        let (status, body) =
            send(&other, Method::POST, "/api/settings/import", Some(exported)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["settings"]["smtp_host"], "smtp.example.com");
    }

    #[tokio::test]
    async fn test_logs_list_and_clear() {
        let state = test_state();
        for title in ["first", "second"] {
            let mut form = valid_form();
            form.page_title = title.to_string();
            let entry = LogEntry::for_submission(&form, "m", LogStatus::Success, None);
            add_log(state.store.as_ref(), &entry).unwrap();
        }

        let (status, body) = send(&state, Method::GET, "/api/logs?limit=1", None).await;
        assert_eq!(status, StatusCode::OK);
        let logs = body["logs"].as_array().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0]["page_title"], "second");

        let (status, body) = send(&state, Method::DELETE, "/api/logs", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], 2);
        assert!(state.store.scan_prefix("log:").unwrap().is_empty());
    }
}
