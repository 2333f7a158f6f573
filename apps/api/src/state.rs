use std::sync::Arc;

use reqwest::Client;

use crate::config::Config;
use crate::storage::KeyValueStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Settings and history. Sled in production, a temporary database in tests.
    pub store: Arc<dyn KeyValueStore>,
    /// One connection pool shared by OpenRouter and Google calls.
    pub http: Client,
    pub config: Config,
}
