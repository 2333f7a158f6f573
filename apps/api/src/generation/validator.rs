//! Content Validator — measures generated text against the keyword rules.
//!
//! Pure functions only: the same content and rules always produce the same outcomes.

use serde::{Deserialize, Serialize};

use crate::generation::rules::VerificationRule;

/// Measured result for one rule on one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub keyword: String,
    pub target_frequency: u32,
    pub actual_frequency: u32,
    pub required_link: String,
    pub link_present: bool,
    /// Full `[text](link)` constructs found for this rule's link.
    pub matched_link_texts: Vec<String>,
}

impl ValidationOutcome {
    pub fn is_satisfied(&self) -> bool {
        self.actual_frequency == self.target_frequency && self.link_present
    }
}

/// Totals across all rules, reported alongside the final content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_expected: u32,
    pub total_actual: u32,
    pub links_expected: u32,
    pub links_found: u32,
}

/// One outcome per rule, in rule order.
pub fn validate(content: &str, rules: &[VerificationRule]) -> Vec<ValidationOutcome> {
    rules
        .iter()
        .map(|v| {
            let matched_link_texts = v.find_links(content);
            ValidationOutcome {
                keyword: v.rule.keyword.clone(),
                target_frequency: v.rule.target_frequency,
                actual_frequency: v.count_keyword(content),
                required_link: v.rule.required_link.clone(),
                link_present: !matched_link_texts.is_empty(),
                matched_link_texts,
            }
        })
        .collect()
}

pub fn all_satisfied(outcomes: &[ValidationOutcome]) -> bool {
    outcomes.iter().all(ValidationOutcome::is_satisfied)
}

pub fn summarize(outcomes: &[ValidationOutcome]) -> AnalysisSummary {
    AnalysisSummary {
        total_expected: outcomes.iter().map(|o| o.target_frequency).sum(),
        total_actual: outcomes.iter().map(|o| o.actual_frequency).sum(),
        links_expected: outcomes.len() as u32,
        links_found: outcomes.iter().filter(|o| o.link_present).count() as u32,
    }
}

/// Approximate word count: whitespace-separated tokens.
pub fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}
