//! Validation Rules
//!
//! Each rule is a pure function over a prepared candidate. A rule returns
//! `Some(reason)` to reject and `None` to pass the candidate on.

use crate::validator::RejectionReason;
use regex::Regex;
use std::sync::OnceLock;

/// The only keyword a candidate may start with.
pub const READ_KEYWORD: &str = "SELECT";

/// Keywords that may not appear anywhere in a candidate, checked in this order.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "DROP", "DELETE", "INSERT", "UPDATE", "TRUNCATE", "ALTER", "CREATE", "REPLACE", "MERGE",
    "CALL", "EXEC", "EXECUTE", "GRANT", "REVOKE", "LOCK", "UNLOCK", "LOAD", "INTO", "OUTFILE",
    "DUMPFILE",
];

pub const STATEMENT_SEPARATOR: &str = ";";

pub const COMMENT_MARKERS: &[&str] = &["--", "/*", "*/"];

pub const SET_COMBINATION_KEYWORD: &str = "UNION";

/// Candidate text as seen by the rules: the raw text plus its upper-cased, trimmed form.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub raw: &'a str,
    pub upper: String,
}

impl<'a> Candidate<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            upper: raw.trim().to_uppercase(),
        }
    }

    /// Leading run of identifier characters, upper-cased.
    pub fn first_token(&self) -> &str {
        let end = self
            .upper
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(self.upper.len());
        &self.upper[..end]
    }
}

/// Tag naming a rule, used for logging and for building custom pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleTag {
    Empty,
    NotARead,
    ForbiddenKeyword,
    StatementSeparator,
    CommentMarker,
    SetCombination,
    NestedRead,
}

pub type RuleFn = fn(&Candidate<'_>) -> Option<RejectionReason>;

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub tag: RuleTag,
    pub check: RuleFn,
}

/// The standard pipeline, in evaluation order.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule { tag: RuleTag::Empty, check: reject_empty },
        Rule { tag: RuleTag::NotARead, check: reject_not_a_read },
        Rule { tag: RuleTag::ForbiddenKeyword, check: reject_forbidden_keyword },
        Rule { tag: RuleTag::StatementSeparator, check: reject_statement_separator },
        Rule { tag: RuleTag::CommentMarker, check: reject_comment_marker },
        Rule { tag: RuleTag::SetCombination, check: reject_set_combination },
        Rule { tag: RuleTag::NestedRead, check: reject_nested_forbidden },
    ]
}

pub fn reject_empty(candidate: &Candidate<'_>) -> Option<RejectionReason> {
    if candidate.upper.is_empty() {
        Some(RejectionReason::Empty)
    } else {
        None
    }
}

pub fn reject_not_a_read(candidate: &Candidate<'_>) -> Option<RejectionReason> {
    let token = candidate.first_token();
    if token == READ_KEYWORD {
        return None;
    }
    Some(RejectionReason::NotARead {
        leading: token.to_string(),
    })
}

pub fn reject_forbidden_keyword(candidate: &Candidate<'_>) -> Option<RejectionReason> {
    find_forbidden(&candidate.upper).map(|keyword| RejectionReason::ForbiddenKeyword { keyword })
}

pub fn reject_statement_separator(candidate: &Candidate<'_>) -> Option<RejectionReason> {
    if candidate.upper.contains(STATEMENT_SEPARATOR) {
        Some(RejectionReason::StatementSeparator)
    } else {
        None
    }
}

pub fn reject_comment_marker(candidate: &Candidate<'_>) -> Option<RejectionReason> {
    COMMENT_MARKERS
        .iter()
        .copied()
        .find(|marker| candidate.upper.contains(marker))
        .map(|marker| RejectionReason::CommentMarker { marker })
}

pub fn reject_set_combination(candidate: &Candidate<'_>) -> Option<RejectionReason> {
    if candidate.upper.contains(SET_COMBINATION_KEYWORD) {
        Some(RejectionReason::SetCombination)
    } else {
        None
    }
}

/// Re-scans every `(SELECT ...)` expression for forbidden keywords.
pub fn reject_nested_forbidden(candidate: &Candidate<'_>) -> Option<RejectionReason> {
    nested_read_pattern()
        .find_iter(&candidate.upper)
        .find_map(|m| find_forbidden(m.as_str()))
        .map(|keyword| RejectionReason::NestedForbiddenKeyword { keyword })
}

fn find_forbidden(upper: &str) -> Option<&'static str> {
    FORBIDDEN_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| upper.contains(keyword))
}

pub(crate) fn is_forbidden_keyword(token: &str) -> bool {
    FORBIDDEN_KEYWORDS.contains(&token)
}

fn nested_read_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\(\s*SELECT[^)]+\)").expect("valid nested read pattern"))
}
