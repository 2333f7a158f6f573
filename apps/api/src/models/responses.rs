use serde::Serialize;

/// `{ success, message }` body returned by the connection-test and settings endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
