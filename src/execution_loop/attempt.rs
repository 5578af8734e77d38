//! Attempt history and request outcomes

use crate::execution::{QueryRows, Row};
use crate::execution_loop::error_classifier::SqlErrorClass;
use crate::validator::RejectionReason;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why one attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptFailure {
    /// The generator was unreachable or returned unusable output.
    Generation { message: String },
    /// The candidate failed a validation rule and was never executed.
    Validation { reason: RejectionReason },
    /// The accepted candidate failed at the data store.
    Execution { message: String, class: SqlErrorClass },
}

impl AttemptFailure {
    /// Text fed back to the generator on the next attempt.
    pub fn feedback(&self) -> String {
        match self {
            AttemptFailure::Generation { message } => message.clone(),
            AttemptFailure::Validation { reason } => reason.to_string(),
            AttemptFailure::Execution { message, .. } => message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded { row_count: usize },
    Failed(AttemptFailure),
}

/// One generate → validate → execute cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    /// 1-indexed
    pub attempt: u32,
    /// Sanitized candidate, absent when generation failed.
    pub candidate: Option<String>,
    pub outcome: AttemptOutcome,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl AttemptRecord {
    pub fn failure(&self) -> Option<&AttemptFailure> {
        match &self.outcome {
            AttemptOutcome::Failed(failure) => Some(failure),
            AttemptOutcome::Succeeded { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySuccess {
    pub query: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    /// 1-indexed attempt on which the query succeeded.
    pub attempt: u32,
    pub history: Vec<AttemptRecord>,
}

/// Attempt budget exhausted without a successful query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryFailure {
    /// Last generated candidate; may have been rejected and is not safe to run.
    pub query: Option<String>,
    pub error: String,
    pub attempts: u32,
    pub last_failure: Option<AttemptFailure>,
    pub history: Vec<AttemptRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    Success(QuerySuccess),
    Failure(QueryFailure),
}

impl QueryOutcome {
    pub(crate) fn success(query: String, rows: QueryRows, attempt: u32, history: Vec<AttemptRecord>) -> Self {
        let row_count = rows.row_count();
        QueryOutcome::Success(QuerySuccess {
            query,
            columns: rows.columns,
            rows: rows.rows,
            row_count,
            attempt,
            history,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, QueryOutcome::Success(_))
    }

    pub fn history(&self) -> &[AttemptRecord] {
        match self {
            QueryOutcome::Success(success) => &success.history,
            QueryOutcome::Failure(failure) => &failure.history,
        }
    }

    /// Response body for the request/response surface.
    pub fn to_response(&self) -> serde_json::Value {
        match self {
            QueryOutcome::Success(s) => serde_json::json!({
                "success": true,
                "query": s.query,
                "results": s.rows,
                "rowCount": s.row_count,
                "attempt": s.attempt,
            }),
            QueryOutcome::Failure(f) => serde_json::json!({
                "success": false,
                "query": f.query,
                "error": f.error,
                "attempts": f.attempts,
            }),
        }
    }
}

impl From<QueryFailure> for QueryOutcome {
    fn from(failure: QueryFailure) -> Self {
        QueryOutcome::Failure(failure)
    }
}
