use crate::config::LlmConfig;
use crate::error::{NlqError, Result};
use crate::generator::SqlGenerator;
use crate::schema::SchemaDescription;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// OpenAI-compatible chat-completions client used as a candidate generator.
pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NlqError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_key: config.api_key.clone().unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn build_prompt(question: &str, schema: &SchemaDescription) -> String {
        format!(
            r#"You are an expert SQL query generator.

Database Schema:
{}

CRITICAL: Return ONLY the SQL query as plain text. Do NOT include:
- Markdown code blocks
- The word "sql" before the query
- Explanations
- Comments
- Any text before or after the query
- Semicolons or UNION operations

SECURITY REQUIREMENTS:
- ONLY generate SELECT queries
- NO INSERT, UPDATE, DELETE, DROP, CREATE, ALTER, or any other DDL/DML operations
- Focus on data retrieval and analysis queries only

User Question: {}

Plain SQL query:"#,
            schema, question
        )
    }

    async fn call_llm(&self, prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(NlqError::Config("OPENAI_API_KEY is not set".to_string()));
        }

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You translate questions into a single read-only SQL query. Return only the query text."},
                {"role": "user", "content": prompt}
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| NlqError::Generation(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| NlqError::Generation(format!("Failed to parse LLM response: {}", e)))?;

        if !status.is_success() {
            let message = response_json["error"]["message"]
                .as_str()
                .unwrap_or("unknown error");
            return Err(NlqError::Generation(format!(
                "LLM API returned {}: {}",
                status, message
            )));
        }

        extract_content(&response_json)
    }
}

fn extract_content(response_json: &serde_json::Value) -> Result<String> {
    response_json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| NlqError::Generation("No content in LLM response".to_string()))
}

#[async_trait]
impl SqlGenerator for LlmClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str, schema: &SchemaDescription) -> Result<String> {
        let full_prompt = Self::build_prompt(prompt, schema);
        let content = self.call_llm(&full_prompt).await?;
        debug!("LLM raw response: {}", content);
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_schema_and_question() {
        let schema = SchemaDescription::from("Table: books\n  - id (INT) PRIMARY KEY");
        let prompt = LlmClient::build_prompt("How many books are there?", &schema);
        assert!(prompt.contains("Table: books"));
        assert!(prompt.contains("User Question: How many books are there?"));
        assert!(prompt.contains("ONLY generate SELECT queries"));
    }

    #[test]
    fn test_extract_content() {
        let response = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "SELECT * FROM books"}}]
        });
        assert_eq!(extract_content(&response).unwrap(), "SELECT * FROM books");

        let empty = serde_json::json!({"choices": []});
        assert!(extract_content(&empty).is_err());
    }

    #[test]
    fn test_from_config_keeps_settings() {
        let client = LlmClient::from_config(&LlmConfig {
            api_key: Some("sk-test".to_string()),
            base_url: "http://localhost:11434/v1/".to_string(),
            timeout_secs: 5,
            ..LlmConfig::default()
        })
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:11434/v1");
        assert_eq!(client.api_key, "sk-test");
        assert_eq!(client.model, "gpt-4");
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_network() {
        let client = LlmClient::from_config(&LlmConfig::default()).unwrap();
        let err = client.generate("q", &SchemaDescription::from("")).await.unwrap_err();
        assert!(matches!(err, NlqError::Config(_)));
    }
}
