//! Generation Orchestrator — drives the constraint-checked generation loop.
//!
//! Flow per attempt: build prompt → call generator → validate → accept or retry.
//!
//! States: `Attempting(1)` → … → `Attempting(MAX_ATTEMPTS)`, ending in
//! `Satisfied` (all rules met) or `Exhausted` (best effort, last content kept).
//! Generator failures end the run immediately and are never retried here.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::generation::issues::identify_issues;
use crate::generation::prompt_builder::{
    build_correction_prompt, build_generation_prompt, sampling_for_attempt,
};
use crate::generation::rules::{extract_rules, KeywordRule};
use crate::generation::validator::{
    all_satisfied, summarize, validate, word_count, AnalysisSummary, ValidationOutcome,
};
use crate::llm_client::prompts::SEO_WRITER_SYSTEM;
use crate::llm_client::{CompletionRequest, LlmClient, LlmError};
use crate::models::seo_form::{ContentLength, SeoFormData};

/// Hard cap on generation calls per request.
pub const MAX_ATTEMPTS: u32 = 3;

// ────────────────────────────────────────────────────────────────────────────
// Generator capability
// ────────────────────────────────────────────────────────────────────────────

/// Anything that turns a completion request into text.
///
/// `LlmClient` is the production implementation; tests script their own.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

#[async_trait]
impl ContentGenerator for LlmClient {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.complete(request).await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Everything the core needs for one run.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub website_name: String,
    pub website_description: String,
    pub page_title: String,
    pub rules: Vec<KeywordRule>,
    pub content_length: ContentLength,
    pub additional_instructions: Option<String>,
    pub model: String,
}

impl GenerationRequest {
    pub fn from_form(form: &SeoFormData, model: &str) -> Self {
        Self {
            website_name: form.website_name.trim().to_string(),
            website_description: form.website_description.trim().to_string(),
            page_title: form.page_title.trim().to_string(),
            rules: form.keyword_rules(),
            content_length: form.content_length,
            additional_instructions: form.additional_prompt.clone(),
            model: model.to_string(),
        }
    }
}

/// One prompt → generate → validate cycle.
#[derive(Debug, Clone)]
pub struct GenerationAttempt {
    pub attempt_number: u32,
    pub prompt_used: String,
    pub raw_content: String,
    pub outcomes: Vec<ValidationOutcome>,
}

/// Final output of a run. `all_satisfied = false` means best effort.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub final_content: String,
    pub word_count: usize,
    pub attempts_used: u32,
    pub outcomes: Vec<ValidationOutcome>,
    pub all_satisfied: bool,
    pub summary: AnalysisSummary,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Attempting(u32),
    Satisfied,
    Exhausted,
}

impl AttemptState {
    /// Next state after attempt `n` was validated.
    pub fn advance(n: u32, satisfied: bool) -> Self {
        if satisfied {
            AttemptState::Satisfied
        } else if n < MAX_ATTEMPTS {
            AttemptState::Attempting(n + 1)
        } else {
            AttemptState::Exhausted
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Loop
// ────────────────────────────────────────────────────────────────────────────

/// Runs up to `MAX_ATTEMPTS` generation attempts and returns the best-effort result.
///
/// Errors only when the generator itself fails; unmet constraints are reported
/// through `GenerationResult::all_satisfied`.
pub async fn run_generation(
    generator: &dyn ContentGenerator,
    request: &GenerationRequest,
) -> Result<GenerationResult, AppError> {
    let rules = extract_rules(&request.rules)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to compile keyword rules: {e}")))?;

    let mut state = AttemptState::Attempting(1);
    let mut last: Option<GenerationAttempt> = None;

    while let AttemptState::Attempting(n) = state {
        let prompt = match &last {
            None => build_generation_prompt(request),
            Some(prev) => {
                let issues = identify_issues(&prev.outcomes);
                build_correction_prompt(request, &prev.raw_content, &issues)
            }
        };

        info!(
            "Generation attempt {}/{} for \"{}\" ({} rules)",
            n,
            MAX_ATTEMPTS,
            request.page_title,
            request.rules.len()
        );

        let completion = CompletionRequest {
            model: request.model.clone(),
            system: SEO_WRITER_SYSTEM.to_string(),
            prompt,
            sampling: sampling_for_attempt(n, request.content_length),
        };

        let raw_content = generator.generate(&completion).await?;
        let outcomes = validate(&raw_content, &rules);
        let satisfied = all_satisfied(&outcomes);

        if !satisfied {
            let issues = identify_issues(&outcomes);
            warn!(
                "Generation attempt {}/{}: {} issue(s): {}",
                n,
                MAX_ATTEMPTS,
                issues.len(),
                issues
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            );
        }

        state = AttemptState::advance(n, satisfied);
        last = Some(GenerationAttempt {
            attempt_number: n,
            prompt_used: completion.prompt,
            raw_content,
            outcomes,
        });
    }

    let attempt = last.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("Generation loop finished without an attempt"))
    })?;

    if state == AttemptState::Exhausted {
        warn!(
            "Max attempts ({}) reached for \"{}\", returning best available content",
            MAX_ATTEMPTS, request.page_title
        );
    }

    Ok(finish(attempt, state == AttemptState::Satisfied))
}

fn finish(attempt: GenerationAttempt, satisfied: bool) -> GenerationResult {
    let summary = summarize(&attempt.outcomes);
    let words = word_count(&attempt.raw_content);

    let mut message = format!(
        "Content generated (~{} words) in {} attempt(s)",
        words, attempt.attempt_number
    );
    if satisfied {
        message.push_str("\nKeywords and internal links all match the requirements");
    } else {
        message.push_str(&format!(
            "\nCheck: keywords {}/{}, links {}/{}",
            summary.total_actual, summary.total_expected, summary.links_found, summary.links_expected
        ));
    }

    info!(
        "Generation finished: attempts={}, satisfied={}, keywords {}/{}, links {}/{}",
        attempt.attempt_number,
        satisfied,
        summary.total_actual,
        summary.total_expected,
        summary.links_found,
        summary.links_expected
    );
    debug!(
        "Final prompt ({} chars):\n{}",
        attempt.prompt_used.len(),
        attempt.prompt_used
    );

    GenerationResult {
        final_content: attempt.raw_content,
        word_count: words,
        attempts_used: attempt.attempt_number,
        outcomes: attempt.outcomes,
        all_satisfied: satisfied,
        summary,
        message,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    pub(crate) fn sample_request() -> GenerationRequest {
        GenerationRequest {
            website_name: "Acme Digital".to_string(),
            website_description: "A digital marketing agency".to_string(),
            page_title: "SEO for small businesses".to_string(),
            rules: vec![
                KeywordRule {
                    keyword: "SEO".to_string(),
                    target_frequency: 2,
                    required_link: "/seo".to_string(),
                },
                KeywordRule {
                    keyword: "content marketing".to_string(),
                    target_frequency: 1,
                    required_link: "/content".to_string(),
                },
            ],
            content_length: ContentLength::Short,
            additional_instructions: None,
            model: "test/model".to_string(),
        }
    }

    /// Replays scripted responses and records every request it received.
    struct ScriptedGenerator {
        responses: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedGenerator {
        fn new(responses: Vec<Result<String, LlmError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<CompletionRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContentGenerator for ScriptedGenerator {
        async fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyContent))
        }
    }

    // "SEO" appears once in the anchor and once in the "/seo" path: exactly 2.
    const GOOD: &str = "# Guide\n[SEO](/seo) helps. Try [content marketing](/content) too.";
    const SEO_OVERUSED_NO_LINK: &str =
        "# Guide\nSEO one, SEO two, SEO three. [content marketing](/content).";
    const ALL_WRONG: &str = "# Guide\nNothing relevant here.";

    #[tokio::test]
    async fn test_first_attempt_satisfied_makes_one_call() {
        let generator = ScriptedGenerator::new(vec![Ok(GOOD.to_string())]);
        let result = run_generation(&generator, &sample_request()).await.unwrap();

        assert!(result.all_satisfied);
        assert_eq!(result.attempts_used, 1);
        assert_eq!(result.final_content, GOOD);
        assert_eq!(generator.calls().len(), 1);
        assert_eq!(result.summary.total_expected, 3);
        assert_eq!(result.summary.links_found, 2);
    }

    #[tokio::test]
    async fn test_correction_prompt_carries_directives() {
        let generator = ScriptedGenerator::new(vec![
            Ok(SEO_OVERUSED_NO_LINK.to_string()),
            Ok(GOOD.to_string()),
        ]);
        let result = run_generation(&generator, &sample_request()).await.unwrap();

        assert!(result.all_satisfied);
        assert_eq!(result.attempts_used, 2);

        let calls = generator.calls();
        assert_eq!(calls.len(), 2);
        let retry = &calls[1];
        assert!(retry.prompt.contains("reduce SEO usage by 1"));
        assert!(retry.prompt.contains("insert link to /seo"));
        assert!(retry.prompt.contains(SEO_OVERUSED_NO_LINK));
        assert!(retry.sampling.temperature < calls[0].sampling.temperature);
        assert_eq!(retry.model, "test/model");
    }

    #[tokio::test]
    async fn test_exhausted_returns_last_content() {
        let generator = ScriptedGenerator::new(vec![
            Ok("first".to_string()),
            Ok("second".to_string()),
            Ok(ALL_WRONG.to_string()),
            Ok(GOOD.to_string()),
        ]);
        let result = run_generation(&generator, &sample_request()).await.unwrap();

        assert!(!result.all_satisfied);
        assert_eq!(result.attempts_used, 3);
        assert_eq!(result.final_content, ALL_WRONG);
        assert_eq!(generator.calls().len(), MAX_ATTEMPTS as usize);
        assert!(result.message.contains("Check: keywords 0/3, links 0/2"));
    }

    #[tokio::test]
    async fn test_transport_error_on_attempt_k_stops_immediately() {
        let generator = ScriptedGenerator::new(vec![
            Ok(ALL_WRONG.to_string()),
            Err(LlmError::Unauthorized("bad key".to_string())),
            Ok(GOOD.to_string()),
        ]);
        let err = run_generation(&generator, &sample_request())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Llm(LlmError::Unauthorized(_))));
        assert_eq!(generator.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_error_on_first_attempt() {
        let generator = ScriptedGenerator::new(vec![Err(LlmError::EmptyContent)]);
        let err = run_generation(&generator, &sample_request())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(LlmError::EmptyContent)));
        assert_eq!(generator.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_single_rule_scenario() {
        let mut request = sample_request();
        request.rules.truncate(1);
        let generator = ScriptedGenerator::new(vec![
            Ok("SEO is great. SEO works. SEO wins.".to_string()),
            Ok("SEO is great. Read [more](/seo).".to_string()),
        ]);
        let result = run_generation(&generator, &request).await.unwrap();

        assert!(result.all_satisfied);
        assert_eq!(result.outcomes[0].actual_frequency, 2);
        let calls = generator.calls();
        assert!(calls[1].prompt.contains("reduce SEO usage by 1"));
        assert!(calls[1].prompt.contains("insert link to /seo"));
    }

    #[test]
    fn test_state_transitions() {
        assert_eq!(AttemptState::advance(1, true), AttemptState::Satisfied);
        assert_eq!(AttemptState::advance(1, false), AttemptState::Attempting(2));
        assert_eq!(AttemptState::advance(2, false), AttemptState::Attempting(3));
        assert_eq!(AttemptState::advance(3, false), AttemptState::Exhausted);
        assert_eq!(AttemptState::advance(3, true), AttemptState::Satisfied);
    }

    #[test]
    fn test_request_from_form_uses_given_model() {
        let form = crate::models::seo_form::tests::valid_form();
        let request = GenerationRequest::from_form(&form, "openai/gpt-4o");
        assert_eq!(request.model, "openai/gpt-4o");
        assert_eq!(request.rules.len(), 2);
        assert_eq!(request.content_length, ContentLength::Short);
    }
}
