use serde::{Deserialize, Serialize};

use crate::generation::rules::KeywordRule;

/// Upper bound on how often a single keyword may be requested.
pub const MAX_KEYWORD_FREQUENCY: u32 = 10;
const MIN_DESCRIPTION_CHARS: usize = 10;

/// Requested article length. Each band maps to a word range and a token budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl ContentLength {
    /// Inclusive word-count range the article should land in.
    pub fn word_range(&self) -> (u32, u32) {
        match self {
            ContentLength::Short => (800, 1_200),
            ContentLength::Medium => (1_500, 2_000),
            ContentLength::Long => (2_500, 3_500),
        }
    }

    pub fn max_tokens(&self) -> u32 {
        match self {
            ContentLength::Short => 3_000,
            ContentLength::Medium => 4_500,
            ContentLength::Long => 6_000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentLength::Short => "short",
            ContentLength::Medium => "medium",
            ContentLength::Long => "long",
        }
    }

    /// e.g. "medium (1,500-2,000 words)"
    pub fn describe(&self) -> String {
        format!("{} ({} words)", self.as_str(), self.word_range_label())
    }

    pub fn word_range_label(&self) -> String {
        let (lo, hi) = self.word_range();
        format!("{}-{}", thousands(lo), thousands(hi))
    }
}

fn thousands(n: u32) -> String {
    if n >= 1_000 {
        format!("{},{:03}", n / 1_000, n % 1_000)
    } else {
        n.to_string()
    }
}

/// One keyword row of the form, as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordLink {
    pub keyword: String,
    pub link: String,
    pub frequency: u32,
}

/// Per-request OpenRouter credentials sent by the settings page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenRouterOverride {
    pub api_key: Option<String>,
    pub model: Option<String>,
}

/// The SEO on-page form submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeoFormData {
    pub website_name: String,
    #[serde(default)]
    pub website_url: Option<String>,
    pub website_description: String,
    pub page_title: String,
    pub keywords_links: Vec<KeywordLink>,
    #[serde(default)]
    pub additional_prompt: Option<String>,
    pub content_length: ContentLength,
    pub recipient_email: String,
    #[serde(default, rename = "_openrouter_settings", skip_serializing)]
    pub openrouter_settings: Option<OpenRouterOverride>,
}

impl SeoFormData {
    /// Returns every input problem in field order. Empty means valid.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.website_name.trim().is_empty() {
            errors.push("website_name is required".to_string());
        }

        if let Some(url) = self.website_url.as_deref().filter(|u| !u.trim().is_empty()) {
            if url::Url::parse(url.trim()).is_err() {
                errors.push(format!("website_url '{url}' is not a valid URL"));
            }
        }

        if self.website_description.trim().chars().count() < MIN_DESCRIPTION_CHARS {
            errors.push(format!(
                "website_description must be at least {MIN_DESCRIPTION_CHARS} characters"
            ));
        }

        if self.page_title.trim().is_empty() {
            errors.push("page_title is required".to_string());
        }

        if self.keywords_links.is_empty() {
            errors.push("at least one keyword and link is required".to_string());
        }

        for (i, item) in self.keywords_links.iter().enumerate() {
            let n = i + 1;
            if item.keyword.trim().is_empty() {
                errors.push(format!("keyword #{n} is empty"));
            }
            if item.link.trim().is_empty() {
                errors.push(format!("link #{n} is empty"));
            } else if !item.link.starts_with('/') {
                errors.push(format!("link #{n} '{}' must start with /", item.link));
            }
            if !(1..=MAX_KEYWORD_FREQUENCY).contains(&item.frequency) {
                errors.push(format!(
                    "frequency #{n} must be between 1 and {MAX_KEYWORD_FREQUENCY}"
                ));
            }
        }

        if self.recipient_email.trim().parse::<lettre::Address>().is_err() {
            errors.push(format!(
                "recipient_email '{}' is not a valid email address",
                self.recipient_email
            ));
        }

        errors
    }

    /// Keyword rules in submission order. Call after `validation_errors()` is empty.
    pub fn keyword_rules(&self) -> Vec<KeywordRule> {
        self.keywords_links
            .iter()
            .map(|k| KeywordRule {
                keyword: k.keyword.trim().to_string(),
                target_frequency: k.frequency,
                required_link: k.link.trim().to_string(),
            })
            .collect()
    }

    pub fn keyword_list(&self) -> Vec<String> {
        self.keywords_links
            .iter()
            .map(|k| k.keyword.trim().to_string())
            .collect()
    }
}
