//! Execution Loop
//!
//! Bounded generate → validate → execute loop with self-correction. Every
//! failure (generation, validation, execution) becomes feedback for the next
//! generation request until the attempt budget runs out.

use crate::config::DEFAULT_MAX_ATTEMPTS;
use crate::error::Result;
use crate::execution::{QueryExecutor, QueryRows};
use crate::execution_loop::attempt::{
    AttemptFailure, AttemptOutcome, AttemptRecord, QueryFailure, QueryOutcome,
};
use crate::execution_loop::error_classifier::ErrorClassifier;
use crate::execution_loop::error_recovery::build_recovery_prompt;
use crate::generator::{sanitize_candidate, SqlGenerator};
use crate::schema::{SchemaDescription, SchemaSource};
use crate::validator::{Validator, Verdict};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Orchestrates one request at a time; holds no per-request state, so one
/// instance can serve concurrent requests.
pub struct ExecutionLoop {
    generator: Arc<dyn SqlGenerator>,
    executor: Arc<dyn QueryExecutor>,
    validator: Validator,
    error_classifier: ErrorClassifier,
    max_attempts: u32,
}

impl ExecutionLoop {
    pub fn new(generator: Arc<dyn SqlGenerator>, executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            generator,
            executor,
            validator: Validator::new(),
            error_classifier: ErrorClassifier::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Budget used by [`ExecutionLoop::answer`].
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Snapshot the schema from `source`, then run the loop with the configured budget.
    ///
    /// Schema extraction failure is the only error returned; everything after
    /// it ends in a [`QueryOutcome`].
    pub async fn answer(&self, question: &str, source: &dyn SchemaSource) -> Result<QueryOutcome> {
        let schema = source.describe_schema().await?;
        Ok(self.run_query(question, &schema, self.max_attempts).await)
    }

    /// Run the self-correcting loop for one question.
    pub async fn run_query(
        &self,
        question: &str,
        schema: &SchemaDescription,
        max_attempts: u32,
    ) -> QueryOutcome {
        let request_id = Uuid::new_v4();
        let span = info_span!("nl_query", %request_id, generator = self.generator.name(), executor = self.executor.name());
        self.run_attempts(question, schema, max_attempts)
            .instrument(span)
            .await
    }

    async fn run_attempts(
        &self,
        question: &str,
        schema: &SchemaDescription,
        max_attempts: u32,
    ) -> QueryOutcome {
        let mut attempt: u32 = 0;
        let mut last_error: Option<String> = None;
        let mut last_candidate: Option<String> = None;
        let mut history: Vec<AttemptRecord> = Vec::new();

        while attempt < max_attempts {
            let number = attempt + 1;
            let started_at = Utc::now();
            let timer = Instant::now();
            info!("Attempt {} of {}", number, max_attempts);

            let prompt = build_recovery_prompt(question, last_error.as_deref());
            let (candidate, outcome) = self.attempt_once(&prompt, schema).await;

            let record = AttemptRecord {
                attempt: number,
                candidate: candidate.clone(),
                outcome: match &outcome {
                    Ok(rows) => AttemptOutcome::Succeeded {
                        row_count: rows.row_count(),
                    },
                    Err(failure) => AttemptOutcome::Failed(failure.clone()),
                },
                started_at,
                elapsed_ms: timer.elapsed().as_millis() as u64,
            };
            history.push(record);

            if candidate.is_some() {
                last_candidate = candidate;
            }

            match outcome {
                Ok(rows) => {
                    info!("Query succeeded on attempt {} with {} rows", number, rows.row_count());
                    // Only accepted candidates reach execution, so one is always present here.
                    let query = last_candidate.unwrap_or_default();
                    return QueryOutcome::success(query, rows, number, history);
                }
                Err(failure) => {
                    warn!("Attempt {} failed: {}", number, failure.feedback());
                    last_error = Some(failure.feedback());
                    attempt += 1;
                }
            }
        }

        warn!("Attempt budget of {} exhausted", max_attempts);
        let last_failure = history.last().and_then(|r| r.failure()).cloned();
        QueryFailure {
            query: last_candidate,
            error: last_error.unwrap_or_else(|| "attempt budget is zero".to_string()),
            attempts: attempt,
            last_failure,
            history,
        }
        .into()
    }

    /// One generate → sanitize → validate → execute cycle.
    async fn attempt_once(
        &self,
        prompt: &str,
        schema: &SchemaDescription,
    ) -> (Option<String>, std::result::Result<QueryRows, AttemptFailure>) {
        let raw = match self.generator.generate(prompt, schema).await {
            Ok(raw) => raw,
            Err(e) => {
                return (
                    None,
                    Err(AttemptFailure::Generation {
                        message: e.to_string(),
                    }),
                )
            }
        };

        let candidate = sanitize_candidate(&raw);
        debug!("Generated SQL: {}", candidate);

        if let Verdict::Rejected(reason) = self.validator.validate(&candidate) {
            warn!("Security: rejected query ({}): {}", reason.category(), candidate);
            return (Some(candidate), Err(AttemptFailure::Validation { reason }));
        }

        let result = self.executor.execute(&candidate).await.map_err(|e| {
            let message = e.to_string();
            let class = self.error_classifier.classify(&message);
            AttemptFailure::Execution { message, class }
        });
        (Some(candidate), result)
    }
}
