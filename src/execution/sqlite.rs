//! SQLite executor
//!
//! Embedded backend for local files and tests. The connection is only ever
//! used from the blocking pool, behind a mutex guard held for one call.

use crate::error::{NlqError, Result};
use crate::execution::{QueryExecutor, QueryRows, Row};
use crate::schema::{ColumnSchema, SchemaDescription, SchemaSource, TableSchema};
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct SqliteExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteExecutor {
    /// Open a database file read-only.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI,
        )?;
        Self::from_connection(conn)
    }

    /// Wrap an existing connection; it is switched to `query_only` mode.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "query_only", true)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| NlqError::Execution("sqlite connection lock poisoned".to_string()))?;
            f(&*guard)
        })
        .await
        .map_err(|e| NlqError::Execution(format!("sqlite task failed: {}", e)))?
    }
}

fn sqlite_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(bytes) => Value::from(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::from(bytes.to_vec()),
    }
}

fn run_query(conn: &Connection, sql: &str) -> Result<QueryRows> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut out = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut record = Row::new();
        for (idx, name) in columns.iter().enumerate() {
            record.insert(name.clone(), sqlite_value(row.get_ref(idx)?));
        }
        out.push(record);
    }
    Ok(QueryRows::new(columns, out))
}

fn read_tables(conn: &Connection) -> Result<Vec<TableSchema>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let pragma = format!("PRAGMA table_info(\"{}\")", name.replace('"', "\"\""));
        let mut info = conn.prepare(&pragma)?;
        let columns = info
            .query_map([], |row| {
                Ok(ColumnSchema {
                    name: row.get(1)?,
                    data_type: row.get::<_, String>(2)?.to_uppercase(),
                    primary_key: row.get::<_, i64>(5)? > 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        tables.push(TableSchema { name, columns });
    }
    Ok(tables)
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn execute(&self, sql: &str) -> Result<QueryRows> {
        let sql = sql.to_string();
        self.with_connection(move |conn| run_query(conn, &sql)).await
    }
}

#[async_trait]
impl SchemaSource for SqliteExecutor {
    async fn describe_schema(&self) -> Result<SchemaDescription> {
        let tables = self
            .with_connection(read_tables)
            .await
            .map_err(|e| NlqError::Schema(format!("Failed to read sqlite schema: {}", e)))?;
        if tables.is_empty() {
            return Err(NlqError::Schema("No tables found".to_string()));
        }
        Ok(SchemaDescription::from_tables(&tables))
    }
}
