//! Query Executors
//!
//! An executor runs one already-validated query against the data store and
//! returns its rows, or an error carrying the engine's message.

pub mod postgres;
pub mod result;
pub mod sqlite;

pub use postgres::PgExecutor;
pub use result::{QueryRows, Row};
pub use sqlite::SqliteExecutor;

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Engine name (e.g. "postgres", "sqlite")
    fn name(&self) -> &'static str;

    /// Execute the query as given, without rewriting it.
    async fn execute(&self, sql: &str) -> Result<QueryRows>;

    /// Check that the store is reachable.
    async fn health_check(&self) -> Result<bool> {
        let rows = self.execute("SELECT 1 AS test").await?;
        Ok(rows.row_count() == 1)
    }
}
