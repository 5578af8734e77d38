//! Configuration
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file. Command-line flags in the `nlq` binary override them.

use crate::error::{NlqError, Result};
use std::collections::HashMap;
use std::str::FromStr;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            temperature: 0.1,
            max_tokens: 500,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub schema: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub statement_timeout_ms: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            schema: "public".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            statement_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub max_attempts: u32,
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
    /// Command line of an external generator tried before the LLM client.
    pub rag_command: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            llm: LlmConfig::default(),
            database: DatabaseConfig::default(),
            rag_command: None,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(std::env::vars().collect())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let defaults = AppConfig::default();
        let text = |key: &str| vars.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Self {
            max_attempts: parse_or(&vars, "NLQ_MAX_ATTEMPTS", defaults.max_attempts)?,
            llm: LlmConfig {
                api_key: text("OPENAI_API_KEY"),
                base_url: text("LLM_BASE_URL").unwrap_or(defaults.llm.base_url),
                model: text("LLM_MODEL").unwrap_or(defaults.llm.model),
                temperature: parse_or(&vars, "LLM_TEMPERATURE", defaults.llm.temperature)?,
                max_tokens: parse_or(&vars, "LLM_MAX_TOKENS", defaults.llm.max_tokens)?,
                timeout_secs: parse_or(&vars, "LLM_TIMEOUT_SECS", defaults.llm.timeout_secs)?,
            },
            database: DatabaseConfig {
                url: text("DATABASE_URL"),
                schema: text("DB_SCHEMA").unwrap_or(defaults.database.schema),
                max_connections: parse_or(&vars, "DB_MAX_CONNECTIONS", defaults.database.max_connections)?,
                acquire_timeout_secs: parse_or(
                    &vars,
                    "DB_ACQUIRE_TIMEOUT_SECS",
                    defaults.database.acquire_timeout_secs,
                )?,
                statement_timeout_ms: parse_opt(&vars, "DB_STATEMENT_TIMEOUT_MS")?,
            },
            rag_command: text("RAG_COMMAND"),
        })
    }
}

fn parse_opt<T: FromStr>(vars: &HashMap<String, String>, key: &str) -> Result<Option<T>> {
    match vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| NlqError::Config(format!("{} has invalid value '{}'", key, raw))),
    }
}

fn parse_or<T: FromStr>(vars: &HashMap<String, String>, key: &str, default: T) -> Result<T> {
    Ok(parse_opt(vars, key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_vars(HashMap::new()).unwrap();
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.llm.model, "gpt-4");
        assert_eq!(config.database.schema, "public");
        assert!(config.database.url.is_none());
        assert!(config.rag_command.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_vars(vars(&[
            ("NLQ_MAX_ATTEMPTS", "4"),
            ("DATABASE_URL", "postgres://localhost/library"),
            ("DB_STATEMENT_TIMEOUT_MS", "5000"),
            ("LLM_BASE_URL", "http://localhost:11434/v1/"),
            ("OPENAI_API_KEY", "  "),
        ]))
        .unwrap();
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.database.url.as_deref(), Some("postgres://localhost/library"));
        assert_eq!(config.database.statement_timeout_ms, Some(5000));
        assert_eq!(config.llm.base_url, "http://localhost:11434/v1/");
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_malformed_number_is_config_error() {
        let err = AppConfig::from_vars(vars(&[("NLQ_MAX_ATTEMPTS", "two")])).unwrap_err();
        assert!(matches!(err, NlqError::Config(_)));
        assert!(err.to_string().contains("NLQ_MAX_ATTEMPTS"));
    }
}
