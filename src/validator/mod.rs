//! Query Validator
//!
//! Trust boundary between generated SQL text and the database. Validation is a
//! deny-list over the candidate text with a single allow-list decision (the
//! leading keyword); it is not a SQL parser and does not prove a query safe.

pub mod rules;

pub use rules::{default_rules, Candidate, Rule, RuleFn, RuleTag};

use serde::Serialize;
use std::fmt;

/// Why a candidate was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category", rename_all = "kebab-case")]
pub enum RejectionReason {
    Empty,
    NotARead { leading: String },
    ForbiddenKeyword { keyword: &'static str },
    StatementSeparator,
    CommentMarker { marker: &'static str },
    SetCombination,
    NestedForbiddenKeyword { keyword: &'static str },
}

impl RejectionReason {
    /// Stable category name.
    pub fn category(&self) -> &'static str {
        match self {
            RejectionReason::Empty => "empty",
            RejectionReason::NotARead { .. } => "not-a-read",
            RejectionReason::ForbiddenKeyword { .. } => "forbidden-keyword",
            RejectionReason::StatementSeparator => "statement-separator",
            RejectionReason::CommentMarker { .. } => "comment-marker",
            RejectionReason::SetCombination => "set-combination",
            RejectionReason::NestedForbiddenKeyword { .. } => "nested-forbidden-keyword",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::Empty => write!(f, "empty query"),
            RejectionReason::NotARead { leading } if leading.is_empty() => {
                write!(f, "not-a-read: query must start with SELECT")
            }
            RejectionReason::NotARead { leading } if rules::is_forbidden_keyword(leading) => {
                write!(f, "not-a-read: forbidden keyword: {}", leading)
            }
            RejectionReason::NotARead { leading } => {
                write!(f, "not-a-read: query starts with {} instead of SELECT", leading)
            }
            RejectionReason::ForbiddenKeyword { keyword } => write!(f, "forbidden keyword: {}", keyword),
            RejectionReason::StatementSeparator => write!(f, "statement separator ';' is not allowed"),
            RejectionReason::CommentMarker { marker } => {
                write!(f, "comment marker '{}' is not allowed", marker)
            }
            RejectionReason::SetCombination => write!(f, "UNION is not allowed"),
            RejectionReason::NestedForbiddenKeyword { keyword } => {
                write!(f, "forbidden keyword in subquery: {}", keyword)
            }
        }
    }
}

/// Result of validating one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(RejectionReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }

    pub fn reason(&self) -> Option<&RejectionReason> {
        match self {
            Verdict::Accepted => None,
            Verdict::Rejected(reason) => Some(reason),
        }
    }
}

/// Ordered pipeline of rules; the first rule that rejects decides the verdict.
#[derive(Debug, Clone)]
pub struct Validator {
    rules: Vec<Rule>,
}

impl Validator {
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> impl Iterator<Item = RuleTag> + '_ {
        self.rules.iter().map(|rule| rule.tag)
    }

    pub fn validate(&self, candidate_text: &str) -> Verdict {
        let candidate = Candidate::new(candidate_text);
        self.rules
            .iter()
            .find_map(|rule| (rule.check)(&candidate))
            .map_or(Verdict::Accepted, Verdict::Rejected)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates with the standard rule pipeline.
pub fn validate(candidate_text: &str) -> Verdict {
    Validator::new().validate(candidate_text)
}
