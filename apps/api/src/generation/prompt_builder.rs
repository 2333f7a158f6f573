//! Prompt Builder — fills the generation and correction templates.

use regex::{Captures, Regex};

use crate::generation::issues::Issue;
use crate::generation::orchestrator::GenerationRequest;
use crate::generation::prompts::{CORRECTION_PROMPT_TEMPLATE, GENERATION_PROMPT_TEMPLATE};
use crate::generation::rules::KeywordRule;
use crate::llm_client::prompts::LINK_FORMAT_INSTRUCTION;
use crate::llm_client::SamplingParams;
use crate::models::seo_form::ContentLength;

const FIRST_ATTEMPT_TEMPERATURE: f32 = 0.7;
/// Corrections aim at literal compliance, not new prose.
const CORRECTION_TEMPERATURE: f32 = 0.3;
const TOP_P: f32 = 0.9;
const PENALTY: f32 = 0.1;

/// Sampling for a 1-based attempt number.
pub fn sampling_for_attempt(attempt: u32, length: ContentLength) -> SamplingParams {
    SamplingParams {
        temperature: if attempt <= 1 {
            FIRST_ATTEMPT_TEMPERATURE
        } else {
            CORRECTION_TEMPERATURE
        },
        max_tokens: length.max_tokens(),
        top_p: TOP_P,
        frequency_penalty: PENALTY,
        presence_penalty: PENALTY,
    }
}

/// Prompt for the first attempt.
pub fn build_generation_prompt(request: &GenerationRequest) -> String {
    let rules = &request.rules;

    let total_usage: u32 = rules.iter().map(|r| r.target_frequency).sum();
    let keyword_list = rules
        .iter()
        .map(|r| format!("\"{}\"", r.keyword))
        .collect::<Vec<_>>()
        .join(", ");
    let usage_rules = rules
        .iter()
        .map(|r| {
            format!(
                "   - \"{}\" = use exactly {} times (no more, no fewer)",
                r.keyword, r.target_frequency
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let link_rules = rules
        .iter()
        .map(|r| {
            format!(
                "   - link to {} as [{}]({}) or with \"{}\" as anchor text",
                r.required_link, r.keyword, r.required_link, r.keyword
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let example_link = rules
        .first()
        .map(|r| format!("[{}]({})", r.keyword, r.required_link))
        .unwrap_or_else(|| "[keyword](/example)".to_string());
    let additional = request
        .additional_instructions
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("none");

    let total_usage = total_usage.to_string();
    let link_count = rules.len().to_string();
    let rules_list = numbered_rules(rules);
    let length_description = request.content_length.describe();
    let word_range = request.content_length.word_range_label();

    fill_template(GENERATION_PROMPT_TEMPLATE, |name| match name {
        "website_name" => Some(request.website_name.as_str()),
        "website_description" => Some(request.website_description.as_str()),
        "page_title" => Some(request.page_title.as_str()),
        "rules_list" => Some(rules_list.as_str()),
        "total_usage" => Some(total_usage.as_str()),
        "keyword_list" => Some(keyword_list.as_str()),
        "link_count" => Some(link_count.as_str()),
        "length_description" => Some(length_description.as_str()),
        "word_range" => Some(word_range.as_str()),
        "additional_prompt" => Some(additional),
        "usage_rules" => Some(usage_rules.as_str()),
        "link_rules" => Some(link_rules.as_str()),
        "link_format_instruction" => Some(LINK_FORMAT_INSTRUCTION),
        "example_link" => Some(example_link.as_str()),
        _ => None,
    })
}

/// Prompt for attempts 2..N: previous output verbatim plus what to fix.
pub fn build_correction_prompt(
    request: &GenerationRequest,
    previous_content: &str,
    issues: &[Issue],
) -> String {
    let issues_text = issues
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n");
    let targets = request
        .rules
        .iter()
        .map(|r| {
            format!(
                "- \"{}\" = exactly {} times + link {}",
                r.keyword, r.target_frequency, r.required_link
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let rules_list = numbered_rules(&request.rules);

    fill_template(CORRECTION_PROMPT_TEMPLATE, |name| match name {
        "issues" => Some(issues_text.as_str()),
        "rules_list" => Some(rules_list.as_str()),
        "targets" => Some(targets.as_str()),
        "previous_content" => Some(previous_content),
        _ => None,
    })
}

/// Replaces every `{name}` in one pass over the template. Substituted text is
/// never rescanned, so user input containing braces is kept verbatim. Unknown
/// names are left as they are.
fn fill_template<'a>(template: &str, value: impl Fn(&str) -> Option<&'a str>) -> String {
    let placeholder = Regex::new(r"\{(\w+)\}").expect("placeholder pattern");
    placeholder
        .replace_all(template, |caps: &Captures| {
            value(&caps[1]).map_or_else(|| caps[0].to_string(), str::to_string)
        })
        .into_owned()
}

fn numbered_rules(rules: &[KeywordRule]) -> String {
    rules
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{}. keyword: \"{}\", use {} times, internal link: {}",
                i + 1,
                r.keyword,
                r.target_frequency,
                r.required_link
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
