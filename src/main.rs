use nlq_engine::config::AppConfig;
use nlq_engine::execution::{PgExecutor, QueryExecutor, SqliteExecutor};
use nlq_engine::execution_loop::ExecutionLoop;
use nlq_engine::generator::{CommandGenerator, FallbackGenerator, SqlGenerator};
use nlq_engine::llm::LlmClient;
use nlq_engine::schema::SchemaSource;
use nlq_engine::validator::{Validator, Verdict};

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nlq")]
#[command(about = "Answer natural-language questions with validated, read-only SQL")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Where queries run. Defaults to DATABASE_URL.
#[derive(ClapArgs)]
struct Backend {
    /// PostgreSQL connection URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Query a SQLite file instead of PostgreSQL (opened read-only)
    #[arg(long, conflicts_with = "database_url")]
    sqlite: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate, validate and run a query for a question
    Ask {
        /// The question in natural language
        question: String,

        #[command(flatten)]
        backend: Backend,

        /// Attempt budget (overrides NLQ_MAX_ATTEMPTS)
        #[arg(long)]
        max_attempts: Option<u32>,

        /// OpenAI API key (or set OPENAI_API_KEY env var)
        #[arg(long)]
        api_key: Option<String>,

        /// Pretty-print the response
        #[arg(long)]
        pretty: bool,

        /// Include the per-attempt history in the output
        #[arg(long)]
        history: bool,
    },
    /// Check a query against the validation rules without running it
    Validate {
        /// Query text
        sql: String,
    },
    /// Print the schema description sent to the generator
    Schema {
        #[command(flatten)]
        backend: Backend,
    },
    /// Check that the database is reachable
    Health {
        #[command(flatten)]
        backend: Backend,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env().context("failed to load configuration")?;

    match args.command {
        Commands::Ask { question, backend, max_attempts, api_key, pretty, history } => {
            if let Some(max_attempts) = max_attempts {
                config.max_attempts = max_attempts;
            }
            if api_key.is_some() {
                config.llm.api_key = api_key;
            }
            run_ask(&config, &question, &backend, pretty, history).await
        }
        Commands::Validate { sql } => run_validate(&sql),
        Commands::Schema { backend } => {
            let (_, schema_source) = open_backend(&mut config, &backend).await?;
            let schema = schema_source.describe_schema().await?;
            println!("{}", schema);
            Ok(())
        }
        Commands::Health { backend } => {
            let (executor, _) = open_backend(&mut config, &backend).await?;
            let report = health_report(executor.health_check().await);
            println!("{}", report);
            if report["status"] != "healthy" {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn health_report(check: nlq_engine::Result<bool>) -> serde_json::Value {
    let timestamp = chrono::Utc::now().to_rfc3339();
    match check {
        Ok(true) => serde_json::json!({
            "status": "healthy",
            "database": "connected",
            "timestamp": timestamp,
        }),
        Ok(false) => serde_json::json!({
            "status": "unhealthy",
            "error": "health query returned no row",
            "timestamp": timestamp,
        }),
        Err(e) => serde_json::json!({
            "status": "unhealthy",
            "error": e.to_string(),
            "timestamp": timestamp,
        }),
    }
}

async fn open_backend(
    config: &mut AppConfig,
    backend: &Backend,
) -> Result<(Arc<dyn QueryExecutor>, Arc<dyn SchemaSource>)> {
    if let Some(path) = &backend.sqlite {
        info!("Opening SQLite database {}", path.display());
        let executor = Arc::new(SqliteExecutor::open_read_only(path)?);
        return Ok((executor.clone() as Arc<dyn QueryExecutor>, executor as Arc<dyn SchemaSource>));
    }

    if backend.database_url.is_some() {
        config.database.url = backend.database_url.clone();
    }
    let executor = Arc::new(PgExecutor::connect(&config.database).await?);
    Ok((executor.clone() as Arc<dyn QueryExecutor>, executor as Arc<dyn SchemaSource>))
}

fn build_generator(config: &AppConfig) -> Result<Arc<dyn SqlGenerator>> {
    let llm: Arc<dyn SqlGenerator> = Arc::new(LlmClient::from_config(&config.llm)?);
    match &config.rag_command {
        Some(command_line) => {
            let rag = Arc::new(CommandGenerator::from_command_line(command_line)?);
            info!("Using RAG command with LLM fallback");
            Ok(Arc::new(FallbackGenerator::new(rag, llm)))
        }
        None => Ok(llm),
    }
}

async fn run_ask(config: &AppConfig, question: &str, backend: &Backend, pretty: bool, history: bool) -> Result<()> {
    let mut config = config.clone();
    let (executor, schema_source) = open_backend(&mut config, backend).await?;
    let generator = build_generator(&config)?;

    info!("Question: {}", question);
    let engine = ExecutionLoop::new(generator, executor).with_max_attempts(config.max_attempts);
    let outcome = engine.answer(question, schema_source.as_ref()).await?;

    let mut response = outcome.to_response();
    if history {
        response["history"] = serde_json::to_value(outcome.history())?;
    }
    if pretty {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", response);
    }

    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_validate(sql: &str) -> Result<()> {
    let validator = Validator::new();
    match validator.validate(sql) {
        Verdict::Accepted => {
            println!("{}", serde_json::json!({ "accepted": true }));
            Ok(())
        }
        Verdict::Rejected(reason) => {
            println!(
                "{}",
                serde_json::json!({ "accepted": false, "reason": reason.to_string(), "rule": reason })
            );
            std::process::exit(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlq_engine::NlqError;

    #[test]
    fn test_health_report_includes_engine_error() {
        let report = health_report(Err(NlqError::Execution("connection refused".to_string())));
        assert_eq!(report["status"], "unhealthy");
        assert_eq!(report["error"], "connection refused");
    }

    #[test]
    fn test_health_report_healthy() {
        let report = health_report(Ok(true));
        assert_eq!(report["status"], "healthy");
        assert_eq!(report["database"], "connected");
    }
}
