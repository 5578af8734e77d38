//! Subprocess generator
//!
//! Runs an external retrieval-augmented generator as
//! `<program> <args..> <question> <schema>` and reads a single JSON document
//! from its stdout: `{"success": true, "query": "..."}` or
//! `{"success": false, "error": "..."}`.

use crate::error::{NlqError, Result};
use crate::generator::SqlGenerator;
use crate::schema::SchemaDescription;
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CommandResponse {
    success: bool,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Builds a generator from a whitespace separated command line such as
    /// `python LangChain/rag_service.py`.
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| NlqError::Config("generator command is empty".to_string()))?;
        Ok(Self::new(program, parts.collect()))
    }
}

fn parse_response(stdout: &str) -> Result<String> {
    let response: CommandResponse = serde_json::from_str(stdout.trim()).map_err(|e| {
        NlqError::Generation(format!("Failed to parse generator response: {}", e))
    })?;

    if !response.success {
        return Err(NlqError::Generation(
            response
                .error
                .unwrap_or_else(|| "generator returned unsuccessful result".to_string()),
        ));
    }

    response
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| NlqError::Generation("generator returned no query".to_string()))
}

#[async_trait]
impl SqlGenerator for CommandGenerator {
    fn name(&self) -> &str {
        "rag-command"
    }

    async fn generate(&self, prompt: &str, schema: &SchemaDescription) -> Result<String> {
        debug!("Running generator command: {} {:?}", self.program, self.args);

        // Arguments are passed directly, never through a shell.
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(prompt)
            .arg(schema.as_str())
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| NlqError::Generation(format!("Failed to start generator: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            // The process may still have reported its own failure as JSON before exiting.
            let reported = serde_json::from_str::<CommandResponse>(stdout.trim())
                .ok()
                .and_then(|response| response.error);
            return Err(NlqError::Generation(
                reported.unwrap_or_else(|| format!("generator failed with {}", output.status)),
            ));
        }

        parse_response(&stdout)
    }
}
