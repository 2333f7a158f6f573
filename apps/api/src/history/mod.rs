//! Submission history: one entry per form submission, whatever its outcome.

pub mod handlers;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::seo_form::{ContentLength, SeoFormData};
use crate::storage::{KeyValueStore, StoreError};

const LOG_PREFIX: &str = "log:";
pub const DEFAULT_LOG_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub website_name: String,
    pub website_url: Option<String>,
    pub page_title: String,
    pub keywords_count: usize,
    pub keywords_list: Vec<String>,
    pub content_length: ContentLength,
    pub model: String,
    pub recipient_email: String,
    pub status: LogStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn for_submission(
        form: &SeoFormData,
        model: &str,
        status: LogStatus,
        error_message: Option<String>,
    ) -> Self {
        let keywords_list = form.keyword_list();
        Self {
            id: Uuid::new_v4(),
            website_name: form.website_name.clone(),
            website_url: form.website_url.clone().filter(|u| !u.trim().is_empty()),
            page_title: form.page_title.clone(),
            keywords_count: keywords_list.len(),
            keywords_list,
            content_length: form.content_length,
            model: model.to_string(),
            recipient_email: form.recipient_email.clone(),
            status,
            error_message,
            created_at: Utc::now(),
        }
    }

    /// Entry for a body that never became a `SeoFormData`. Fields are taken
    /// from the raw JSON where present.
    pub fn from_raw(body: &Value, model: &str, error_message: String) -> Self {
        let text = |field: &str| {
            body.get(field)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let keywords_list: Vec<String> = body
            .get("keywords_links")
            .and_then(Value::as_array)
            .map(|links| {
                links
                    .iter()
                    .filter_map(|l| l.get("keyword").and_then(Value::as_str))
                    .map(|k| k.trim().to_string())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: Uuid::new_v4(),
            website_name: text("website_name"),
            website_url: Some(text("website_url")).filter(|u| !u.trim().is_empty()),
            page_title: text("page_title"),
            keywords_count: keywords_list.len(),
            keywords_list,
            content_length: body
                .get("content_length")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default(),
            model: model.to_string(),
            recipient_email: text("recipient_email"),
            status: LogStatus::Error,
            error_message: Some(error_message),
            created_at: Utc::now(),
        }
    }
}

/// Appends `entry`. Keys are zero-padded sequence numbers so key order is
/// insertion order.
pub fn add_log(store: &dyn KeyValueStore, entry: &LogEntry) -> Result<(), StoreError> {
    let seq = store.next_id()?;
    store.put(&format!("{LOG_PREFIX}{seq:020}"), &serde_json::to_vec(entry)?)
}

/// Newest first, at most `limit` entries.
pub fn get_logs(store: &dyn KeyValueStore, limit: usize) -> Result<Vec<LogEntry>, StoreError> {
    store
        .scan_prefix(LOG_PREFIX)?
        .into_iter()
        .rev()
        .take(limit)
        .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(StoreError::from))
        .collect()
}

pub fn clear_logs(store: &dyn KeyValueStore) -> Result<usize, StoreError> {
    store.clear_prefix(LOG_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::seo_form::tests::valid_form;
    use crate::storage::SledStore;

    fn entry(title: &str, status: LogStatus) -> LogEntry {
        let mut form = valid_form();
        form.page_title = title.to_string();
        LogEntry::for_submission(&form, "test/model", status, None)
    }

    #[test]
    fn test_entry_from_form() {
        let e = entry("Brewing", LogStatus::Success);
        assert_eq!(e.keywords_count, 2);
        assert_eq!(e.keywords_list, vec!["pour-over", "coffee beans"]);
        assert_eq!(e.model, "test/model");
        assert_eq!(e.content_length, ContentLength::Short);
    }

    #[test]
    fn test_logs_are_newest_first_and_limited() {
        let store = SledStore::temporary().unwrap();
        for i in 0..5 {
            add_log(&store, &entry(&format!("page {i}"), LogStatus::Success)).unwrap();
        }

        let logs = get_logs(&store, 3).unwrap();
        let titles: Vec<_> = logs.iter().map(|l| l.page_title.as_str()).collect();
        assert_eq!(titles, vec!["page 4", "page 3", "page 2"]);

        assert_eq!(get_logs(&store, DEFAULT_LOG_LIMIT).unwrap().len(), 5);
    }

    #[test]
    fn test_clear_logs() {
        let store = SledStore::temporary().unwrap();
        add_log(&store, &entry("a", LogStatus::Error)).unwrap();
        add_log(&store, &entry("b", LogStatus::Success)).unwrap();

        assert_eq!(clear_logs(&store).unwrap(), 2);
        assert!(get_logs(&store, DEFAULT_LOG_LIMIT).unwrap().is_empty());
    }

    #[test]
    fn test_entry_from_unparsed_body() {
        let body = serde_json::json!({
            "website_name": "Acme Coffee",
            "content_length": "huge",
            "keywords_links": [
                { "keyword": " pour-over ", "link": "/pour-over", "frequency": -1 }
            ]
        });
        let e = LogEntry::from_raw(&body, "test/model", "Invalid form data".to_string());
        assert_eq!(e.website_name, "Acme Coffee");
        assert_eq!(e.page_title, "");
        assert!(e.website_url.is_none());
        assert_eq!(e.keywords_list, vec!["pour-over"]);
        assert_eq!(e.content_length, ContentLength::Medium);
        assert_eq!(e.status, LogStatus::Error);
        assert_eq!(e.error_message.as_deref(), Some("Invalid form data"));

        let e = LogEntry::from_raw(&Value::Null, "m", "bad json".to_string());
        assert_eq!(e.keywords_count, 0);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let value = serde_json::to_value(entry("x", LogStatus::Error)).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["content_length"], "short");
    }
}
