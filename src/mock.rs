//! Scripted collaborators for tests and offline runs.

use crate::error::{NlqError, Result};
use crate::execution::{QueryExecutor, QueryRows, Row};
use crate::generator::SqlGenerator;
use crate::schema::SchemaDescription;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Returns scripted responses in order; the last response repeats once the
/// script runs out. `Err` entries become generation failures.
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    last: Mutex<Option<std::result::Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<std::result::Result<String, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(sql: &str) -> Self {
        Self::new(vec![Ok(sql.to_string())])
    }

    pub fn sequence(sqls: &[&str]) -> Self {
        Self::new(sqls.iter().map(|s| Ok(s.to_string())).collect())
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }
}

#[async_trait]
impl SqlGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, _schema: &SchemaDescription) -> Result<String> {
        let poisoned = || NlqError::Generation("scripted generator lock poisoned".to_string());
        self.prompts.lock().map_err(|_| poisoned())?.push(prompt.to_string());

        let next = self.script.lock().map_err(|_| poisoned())?.pop_front();
        let mut last = self.last.lock().map_err(|_| poisoned())?;
        if let Some(response) = next {
            *last = Some(response);
        }
        match last.clone() {
            Some(Ok(sql)) => Ok(sql),
            Some(Err(message)) => Err(NlqError::Generation(message)),
            None => Err(NlqError::Generation("script is empty".to_string())),
        }
    }
}

enum Backing {
    Fixed(std::result::Result<QueryRows, String>),
    Inner(Arc<dyn QueryExecutor>),
}

/// Executor that records every query it receives, then either answers with a
/// fixed response or delegates to a real executor.
pub struct RecordingExecutor {
    backing: Backing,
    queries: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    fn with_backing(backing: Backing) -> Self {
        Self {
            backing,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(rows: QueryRows) -> Self {
        Self::with_backing(Backing::Fixed(Ok(rows)))
    }

    pub fn wrapping(inner: Arc<dyn QueryExecutor>) -> Self {
        Self::with_backing(Backing::Inner(inner))
    }

    /// `count` rows of `{"id": n}`.
    pub fn with_rows(count: usize) -> Self {
        let rows = (1..=count)
            .map(|id| {
                let mut row = Row::new();
                row.insert("id".to_string(), serde_json::Value::from(id));
                row
            })
            .collect();
        Self::returning(QueryRows::new(vec!["id".to_string()], rows))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_backing(Backing::Fixed(Err(message.to_string())))
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().map(|q| q.len()).unwrap_or_default()
    }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    fn name(&self) -> &'static str {
        match &self.backing {
            Backing::Fixed(_) => "recording",
            Backing::Inner(inner) => inner.name(),
        }
    }

    async fn execute(&self, sql: &str) -> Result<QueryRows> {
        self.queries
            .lock()
            .map_err(|_| NlqError::Execution("recording executor lock poisoned".to_string()))?
            .push(sql.to_string());
        match &self.backing {
            Backing::Fixed(response) => response.clone().map_err(NlqError::Execution),
            Backing::Inner(inner) => inner.execute(sql).await,
        }
    }
}
