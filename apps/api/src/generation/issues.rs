//! Issue Reporter — turns failed validation outcomes into correction directives.

use std::fmt;

use serde::Serialize;

use crate::generation::validator::ValidationOutcome;

/// A single thing the next attempt must fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    Overused {
        keyword: String,
        actual: u32,
        target: u32,
    },
    Underused {
        keyword: String,
        actual: u32,
        target: u32,
    },
    MissingLink {
        keyword: String,
        link: String,
    },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::Overused {
                keyword,
                actual,
                target,
            } => write!(
                f,
                "\"{keyword}\" is used too often ({actual}/{target}): reduce {keyword} usage by {}",
                actual - target
            ),
            Issue::Underused {
                keyword,
                actual,
                target,
            } => write!(
                f,
                "\"{keyword}\" is used too rarely ({actual}/{target}): increase {keyword} usage by {}",
                target - actual
            ),
            Issue::MissingLink { keyword, link } => {
                write!(f, "missing internal link: insert link to {link} as [{keyword}]({link})")
            }
        }
    }
}

/// Directives for every failing condition, in rule order. Satisfied rules add nothing.
pub fn identify_issues(outcomes: &[ValidationOutcome]) -> Vec<Issue> {
    let mut issues = Vec::new();

    for o in outcomes {
        if o.actual_frequency > o.target_frequency {
            issues.push(Issue::Overused {
                keyword: o.keyword.clone(),
                actual: o.actual_frequency,
                target: o.target_frequency,
            });
        } else if o.actual_frequency < o.target_frequency {
            issues.push(Issue::Underused {
                keyword: o.keyword.clone(),
                actual: o.actual_frequency,
                target: o.target_frequency,
            });
        }

        if !o.link_present {
            issues.push(Issue::MissingLink {
                keyword: o.keyword.clone(),
                link: o.required_link.clone(),
            });
        }
    }

    issues
}
