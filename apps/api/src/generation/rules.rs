//! Keyword Constraint Extractor — turns submitted keyword rules into compiled
//! verification patterns.
//!
//! Keywords are user text and are always escaped before being embedded in a
//! pattern, so `.`, `+`, `(` and friends match literally.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// A required keyword, how many times it must appear, and the internal link it
/// must anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub target_frequency: u32,
    /// Site-relative path, always starting with `/`.
    pub required_link: String,
}

/// A `KeywordRule` with its scanning patterns compiled.
#[derive(Debug, Clone)]
pub struct VerificationRule {
    pub rule: KeywordRule,
    keyword_pattern: Regex,
    link_pattern: Regex,
}

impl VerificationRule {
    pub fn compile(rule: KeywordRule) -> Result<Self, regex::Error> {
        let keyword_pattern = RegexBuilder::new(&regex::escape(&rule.keyword))
            .case_insensitive(true)
            .build()?;

        // Any anchor text, whole path; path case is ignored like keyword case.
        let link_pattern = RegexBuilder::new(&format!(
            r"\[[^\]]*\]\({}\)",
            regex::escape(&rule.required_link)
        ))
        .case_insensitive(true)
        .build()?;

        Ok(Self {
            rule,
            keyword_pattern,
            link_pattern,
        })
    }

    /// Non-overlapping, case-insensitive, literal occurrences of the keyword.
    /// Not word-boundary aware: "SEO" is also counted inside "SEOs".
    pub fn count_keyword(&self, content: &str) -> u32 {
        self.keyword_pattern.find_iter(content).count() as u32
    }

    /// Every `[text](required_link)` construct found in the content.
    pub fn find_links(&self, content: &str) -> Vec<String> {
        self.link_pattern
            .find_iter(content)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// Compiles every rule, preserving input order.
pub fn extract_rules(rules: &[KeywordRule]) -> Result<Vec<VerificationRule>, regex::Error> {
    rules.iter().cloned().map(VerificationRule::compile).collect()
}
