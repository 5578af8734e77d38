pub mod config;
pub mod error;
pub mod execution;
pub mod execution_loop;
pub mod generator;
pub mod llm;
pub mod mock;
pub mod schema;
pub mod validator;

pub use config::AppConfig;
pub use error::{NlqError, Result};
pub use execution::{PgExecutor, QueryExecutor, QueryRows, SqliteExecutor};
pub use execution_loop::{ExecutionLoop, QueryOutcome};
pub use generator::SqlGenerator;
pub use schema::{SchemaDescription, SchemaSource};
pub use validator::{validate, RejectionReason, Validator, Verdict};
