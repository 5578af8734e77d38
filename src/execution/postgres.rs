//! PostgreSQL executor backed by a sqlx connection pool

use crate::config::DatabaseConfig;
use crate::error::{NlqError, Result};
use crate::execution::{QueryExecutor, QueryRows, Row};
use crate::schema::{ColumnSchema, SchemaDescription, SchemaSource, TableSchema};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA_QUERY: &str = r#"
SELECT c.table_name::text AS table_name,
       c.column_name::text AS column_name,
       c.data_type::text AS data_type,
       EXISTS (
           SELECT 1
           FROM information_schema.table_constraints tc
           JOIN information_schema.key_column_usage k
             ON tc.constraint_name = k.constraint_name
            AND tc.table_schema = k.table_schema
            AND tc.table_name = k.table_name
           WHERE tc.constraint_type = 'PRIMARY KEY'
             AND tc.table_schema = c.table_schema
             AND tc.table_name = c.table_name
             AND k.column_name = c.column_name
       ) AS is_primary
FROM information_schema.columns c
WHERE c.table_schema = $1
ORDER BY c.table_name, c.ordinal_position
"#;

#[derive(Debug)]
pub struct PgExecutor {
    pool: PgPool,
    schema: String,
}

impl PgExecutor {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    /// Connect a pool whose sessions default to read-only transactions.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| NlqError::Config("DATABASE_URL is not set".to_string()))?;
        let setup = session_setup(config.statement_timeout_ms);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .after_connect(move |conn, _meta| {
                let setup = setup.clone();
                Box::pin(async move {
                    for statement in &setup {
                        sqlx::query(statement).execute(&mut *conn).await?;
                    }
                    Ok(())
                })
            })
            .connect(url)
            .await?;

        info!("Connected PostgreSQL pool (max {} connections)", config.max_connections);
        Ok(Self::new(pool, config.schema.clone()))
    }
}

/// Statements run on every new pooled connection.
fn session_setup(statement_timeout_ms: Option<u64>) -> Vec<String> {
    let mut statements = vec!["SET default_transaction_read_only = on".to_string()];
    if let Some(ms) = statement_timeout_ms {
        statements.push(format!("SET statement_timeout = {}", ms));
    }
    statements
}

fn pg_value(row: &PgRow, idx: usize) -> Result<Value> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let decoded = match type_name.as_str() {
        "BOOL" => row.try_get::<bool, _>(idx).map(Value::from),
        "INT2" => row.try_get::<i16, _>(idx).map(Value::from),
        "INT4" => row.try_get::<i32, _>(idx).map(Value::from),
        "INT8" => row.try_get::<i64, _>(idx).map(Value::from),
        "FLOAT4" => row.try_get::<f32, _>(idx).map(|v| Value::from(f64::from(v))),
        "FLOAT8" => row.try_get::<f64, _>(idx).map(Value::from),
        // Kept as text so scale and precision survive (`9.50`, `12345678901234567890.1`).
        "NUMERIC" => row
            .try_get::<Decimal, _>(idx)
            .map(|v| Value::from(v.to_string())),
        "JSON" | "JSONB" => row.try_get::<Value, _>(idx),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(idx)
            .map(|v| Value::from(v.to_string())),
        "TIME" => row
            .try_get::<chrono::NaiveTime, _>(idx)
            .map(|v| Value::from(v.to_string())),
        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(idx)
            .map(|v| Value::from(v.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
            .map(|v| Value::from(v.to_rfc3339())),
        "UUID" => row.try_get::<uuid::Uuid, _>(idx).map(|v| Value::from(v.to_string())),
        "BYTEA" => row.try_get::<Vec<u8>, _>(idx).map(Value::from),
        _ => row.try_get::<String, _>(idx).map(Value::from),
    };

    decoded.map_err(|e| {
        let column = row.columns()[idx].name();
        debug!("Cannot decode column {} of type {}: {}", column, type_name, e);
        NlqError::Execution(format!(
            "cannot decode column \"{}\" of type {}; cast it to text in the query",
            column, type_name
        ))
    })
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn execute(&self, sql: &str) -> Result<QueryRows> {
        // Returned to the pool when `conn` drops, on success and on error.
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;

        let columns: Vec<String> = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut record = Row::new();
            for (idx, name) in columns.iter().enumerate() {
                record.insert(name.clone(), pg_value(row, idx)?);
            }
            out.push(record);
        }

        Ok(QueryRows::new(columns, out))
    }
}

#[async_trait]
impl SchemaSource for PgExecutor {
    async fn describe_schema(&self) -> Result<SchemaDescription> {
        let rows = sqlx::query(SCHEMA_QUERY)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| NlqError::Schema(format!("Failed to read information_schema: {}", e)))?;

        let mut tables: Vec<TableSchema> = Vec::new();
        for row in &rows {
            let table_name: String = row.try_get("table_name")?;
            let column = ColumnSchema {
                name: row.try_get("column_name")?,
                data_type: row.try_get::<String, _>("data_type")?.to_uppercase(),
                primary_key: row.try_get("is_primary")?,
            };
            match tables.last_mut() {
                Some(table) if table.name == table_name => table.columns.push(column),
                _ => tables.push(TableSchema {
                    name: table_name,
                    columns: vec![column],
                }),
            }
        }

        if tables.is_empty() {
            return Err(NlqError::Schema(format!(
                "No tables found in schema '{}'",
                self.schema
            )));
        }
        Ok(SchemaDescription::from_tables(&tables))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_setup_is_read_only() {
        assert_eq!(session_setup(None), vec!["SET default_transaction_read_only = on"]);
    }

    #[test]
    fn test_session_setup_with_statement_timeout() {
        assert_eq!(
            session_setup(Some(5000)),
            vec!["SET default_transaction_read_only = on", "SET statement_timeout = 5000"]
        );
    }

    #[tokio::test]
    async fn test_connect_requires_url() {
        let err = PgExecutor::connect(&DatabaseConfig::default()).await.unwrap_err();
        assert!(matches!(err, NlqError::Config(_)));
    }
}
