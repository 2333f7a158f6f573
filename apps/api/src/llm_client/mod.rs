/// LLM Client — the single point of entry for all OpenRouter calls.
///
/// ARCHITECTURAL RULE: No other module may call the chat-completions API directly.
///
/// The client never retries. A failed call is reported to the caller as-is;
/// re-prompting is the generation orchestrator's job and only for content problems.
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;

use prompts::CONNECTION_TEST_PROMPT;

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const APP_TITLE: &str = "SEO Onpage Generator";
/// Model used when neither the request, the settings nor the environment name one.
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-r1-0528-qwen3-8b";
/// Every OpenRouter key carries this prefix.
pub const API_KEY_PREFIX: &str = "sk-or-v1-";
/// Long-form generation can take minutes.
pub const REQUEST_TIMEOUT_SECS: u64 = 180;

/// Shared keys published in tutorials. They are rejected up front.
const DEMO_KEYS: &[&str] = &["sk-or-v1-test", "sk-or-v1-demo", "sk-or-v1-example"];

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Unauthorized(String),

    #[error("access forbidden: {0}")]
    Forbidden(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("invalid API key: {0}")]
    InvalidKey(String),
}

impl LlmError {
    /// Credential problems the user has to fix on the settings page.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            LlmError::Unauthorized(_) | LlmError::Forbidden(_) | LlmError::InvalidKey(_)
        )
    }
}

/// Sampling parameters sent with every completion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

/// One completion call: what to ask, which model, and how to sample.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub sampling: SamplingParams,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(flatten)]
    sampling: SamplingParams,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl ChatResponse {
    /// Content of the first choice, if it is present and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct OpenRouterError {
    error: OpenRouterErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenRouterErrorBody {
    message: String,
}

/// Builds the HTTP client shared by the LLM client and the delivery pipeline.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
}

/// OpenRouter chat-completions client bound to one API key.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    app_url: String,
}

impl LlmClient {
    /// Fails fast on keys that cannot be valid OpenRouter keys.
    pub fn new(client: Client, api_key: String, app_url: String) -> Result<Self, LlmError> {
        check_api_key(&api_key)?;
        Ok(Self {
            client,
            api_key,
            app_url,
        })
    }

    /// Makes a single call to the chat-completions API.
    pub async fn call(&self, request: &CompletionRequest) -> Result<ChatResponse, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if !request.system.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: &request.system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: &request.model,
            messages,
            sampling: request.sampling,
        };

        debug!(
            "OpenRouter request: model={}, max_tokens={}, temperature={}",
            request.model, request.sampling.max_tokens, request.sampling.temperature
        );

        let response = self
            .client
            .post(OPENROUTER_API_URL)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.app_url)
            .header("X-Title", APP_TITLE)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(error_for_status(status, &text));
        }

        let chat: ChatResponse = serde_json::from_str(&text)?;

        if let Some(usage) = &chat.usage {
            debug!(
                "OpenRouter call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(chat)
    }

    /// Calls the model and returns only the generated text.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let response = self.call(request).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }

    /// Sends a tiny prompt to check that the key and model answer.
    pub async fn test_connection(&self, model: &str) -> Result<String, LlmError> {
        let request = CompletionRequest {
            model: model.to_string(),
            system: String::new(),
            prompt: CONNECTION_TEST_PROMPT.to_string(),
            sampling: SamplingParams {
                temperature: 0.1,
                max_tokens: 50,
                top_p: 1.0,
                frequency_penalty: 0.0,
                presence_penalty: 0.0,
            },
        };
        self.complete(&request).await
    }
}

/// Rejects keys without the OpenRouter prefix and known shared demo keys.
pub fn check_api_key(api_key: &str) -> Result<(), LlmError> {
    if api_key.trim().is_empty() {
        return Err(LlmError::InvalidKey("API key is missing".to_string()));
    }
    if !api_key.starts_with(API_KEY_PREFIX) {
        return Err(LlmError::InvalidKey(format!(
            "API key must start with \"{API_KEY_PREFIX}\""
        )));
    }
    if DEMO_KEYS.contains(&api_key) {
        return Err(LlmError::InvalidKey(
            "shared demo keys are not accepted; create your own key at openrouter.ai".to_string(),
        ));
    }
    Ok(())
}

/// Maps a non-2xx response to the error taxonomy, preferring `error.message` from the body.
fn error_for_status(status: StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<OpenRouterError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::UNAUTHORIZED => LlmError::Unauthorized(message),
        StatusCode::FORBIDDEN => LlmError::Forbidden(message),
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited(message),
        _ => LlmError::Api {
            status: status.as_u16(),
            message,
        },
    }
}
