//! Candidate Generators
//!
//! A generator turns a prompt plus the schema description into raw SQL text.
//! Generators are untrusted: their output is sanitized and validated by the
//! execution loop before anything touches the database.

pub mod command;
pub mod sanitize;

pub use command::CommandGenerator;
pub use sanitize::sanitize_candidate;

use crate::error::{NlqError, Result};
use crate::schema::SchemaDescription;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

#[async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Generator name for logs (e.g. "openai", "rag-command")
    fn name(&self) -> &str;

    /// Produce candidate SQL text for `prompt`.
    async fn generate(&self, prompt: &str, schema: &SchemaDescription) -> Result<String>;
}

/// Tries `primary` first and falls back to `fallback` when it fails.
pub struct FallbackGenerator {
    primary: Arc<dyn SqlGenerator>,
    fallback: Arc<dyn SqlGenerator>,
}

impl FallbackGenerator {
    pub fn new(primary: Arc<dyn SqlGenerator>, fallback: Arc<dyn SqlGenerator>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl SqlGenerator for FallbackGenerator {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn generate(&self, prompt: &str, schema: &SchemaDescription) -> Result<String> {
        match self.primary.generate(prompt, schema).await {
            Ok(sql) => Ok(sql),
            Err(primary_err) => {
                warn!(
                    "{} generator failed: {}, falling back to {}",
                    self.primary.name(),
                    primary_err,
                    self.fallback.name()
                );
                self.fallback.generate(prompt, schema).await.map_err(|fallback_err| {
                    NlqError::Generation(format!(
                        "Failed to generate SQL query with both {} and {}: {}",
                        self.primary.name(),
                        self.fallback.name(),
                        fallback_err
                    ))
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedGenerator;

    #[tokio::test]
    async fn test_fallback_used_when_primary_fails() {
        let primary = Arc::new(ScriptedGenerator::new(vec![Err("rag unavailable".to_string())]));
        let fallback = Arc::new(ScriptedGenerator::always("SELECT 1"));
        let generator = FallbackGenerator::new(primary.clone(), fallback.clone());

        let sql = generator.generate("q", &SchemaDescription::from("")).await.unwrap();
        assert_eq!(sql, "SELECT 1");
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = Arc::new(ScriptedGenerator::always("SELECT 2"));
        let fallback = Arc::new(ScriptedGenerator::always("SELECT 1"));
        let generator = FallbackGenerator::new(primary, fallback.clone());

        assert_eq!(generator.generate("q", &SchemaDescription::from("")).await.unwrap(), "SELECT 2");
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_both_failing_is_a_generation_error() {
        let generator = FallbackGenerator::new(
            Arc::new(ScriptedGenerator::new(vec![Err("down".to_string())])),
            Arc::new(ScriptedGenerator::new(vec![Err("quota".to_string())])),
        );
        let err = generator.generate("q", &SchemaDescription::from("")).await.unwrap_err();
        assert!(matches!(err, NlqError::Generation(_)));
        assert!(err.to_string().contains("quota"));
    }
}
