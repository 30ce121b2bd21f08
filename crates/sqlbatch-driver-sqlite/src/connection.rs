//! SQLite connection implementation

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection as RusqliteConnection, ErrorCode, InterruptHandle, OpenFlags};
use sqlbatch_core::{
    Connection, Parameter, QueryCancelHandle, Result, SqlBatchError, StatementResult, Value,
    split_statements, sql_preview,
};

/// Cancel handle for SQLite statements.
///
/// Wraps the rusqlite `InterruptHandle`; the interrupted command fails with
/// `SqlBatchError::Cancelled` and its statements are rolled back.
pub struct SqliteCancelHandle {
    interrupt_handle: Arc<InterruptHandle>,
}

impl QueryCancelHandle for SqliteCancelHandle {
    fn cancel(&self) {
        tracing::debug!("Interrupting SQLite statement");
        self.interrupt_handle.interrupt();
    }
}

/// SQLite execution service.
///
/// A command may hold several `;`-separated statements. They share one
/// parameter list, bound by name, and run inside a savepoint so a failing
/// statement leaves none of the command's changes behind.
pub struct SqliteConnection {
    conn: Arc<Mutex<RusqliteConnection>>,
    interrupt_handle: Arc<InterruptHandle>,
}

impl SqliteConnection {
    /// Open (or create) a SQLite database file
    pub fn open(path: &str) -> Result<Self> {
        tracing::info!(path = %path, "opening SQLite database");
        if path == ":memory:" {
            return Self::open_in_memory();
        }

        let expanded_path = Self::expand_path(path)?;
        if !expanded_path.starts_with("file:") {
            let file_path = std::path::Path::new(&expanded_path);
            if let Some(parent) = file_path.parent()
                && !parent.exists()
            {
                return Err(SqlBatchError::Connection(format!(
                    "Parent directory does not exist: {}",
                    parent.display()
                )));
            }
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = RusqliteConnection::open_with_flags(&expanded_path, flags).map_err(|e| {
            SqlBatchError::Connection(format!(
                "Failed to open SQLite database at '{}': {}",
                expanded_path, e
            ))
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| SqlBatchError::Connection(format!("Failed to set journal mode: {}", e)))?;

        Self::from_rusqlite(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = RusqliteConnection::open_in_memory().map_err(|e| {
            SqlBatchError::Connection(format!("Failed to open in-memory database: {}", e))
        })?;
        Self::from_rusqlite(conn)
    }

    fn from_rusqlite(conn: RusqliteConnection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON").map_err(|e| {
            SqlBatchError::Connection(format!("Failed to enable foreign keys: {}", e))
        })?;

        // Taken before the connection moves behind the mutex so it can be
        // used while a statement holds the lock
        let interrupt_handle = Arc::new(conn.get_interrupt_handle());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt_handle,
        })
    }

    /// Expand `~/` and make relative paths absolute
    fn expand_path(path: &str) -> Result<String> {
        if path.starts_with("file:") {
            return Ok(path.to_string());
        }

        let expanded = if let Some(rest) = path.strip_prefix("~/") {
            match std::env::var_os("HOME") {
                Some(home) => std::path::PathBuf::from(home)
                    .join(rest)
                    .to_string_lossy()
                    .to_string(),
                None => {
                    return Err(SqlBatchError::Configuration(
                        "Unable to determine HOME directory".into(),
                    ));
                }
            }
        } else if path.starts_with('~') {
            return Err(SqlBatchError::Configuration(
                "User-specific home directories (~user) are not supported".into(),
            ));
        } else {
            path.to_string()
        };

        let path_buf = std::path::PathBuf::from(&expanded);
        if path_buf.is_relative() {
            Ok(std::env::current_dir()?
                .join(path_buf)
                .to_string_lossy()
                .to_string())
        } else {
            Ok(expanded)
        }
    }

    /// Run a parameterless script, such as schema setup
    pub async fn execute_batch(&self, sql: &str) -> Result<()> {
        tracing::debug!("executing SQL script");
        let conn = self.conn.lock();
        conn.execute_batch(sql)
            .map_err(|e| map_sqlite_error("Failed to execute script", e))
    }

    /// Run a query and collect every row
    pub async fn query_rows(&self, sql: &str, params: &[Parameter]) -> Result<Vec<Vec<Value>>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| map_sqlite_error("Failed to prepare query", e))?;
        bind_by_name(&mut stmt, params)?;

        let column_count = stmt.column_count();
        let mut rows = Vec::new();
        let mut query_rows = stmt.raw_query();
        while let Some(row) = query_rows
            .next()
            .map_err(|e| map_sqlite_error("Failed to fetch row", e))?
        {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(rusqlite_to_value(row, i)?);
            }
            rows.push(values);
        }

        tracing::debug!(row_count = rows.len(), "query executed");
        Ok(rows)
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql_preview(sql, 100)))]
    async fn execute(&self, sql: &str, params: &[Parameter]) -> Result<StatementResult> {
        let start_time = Instant::now();
        let statements = split_statements(sql);
        if statements.is_empty() {
            return Err(SqlBatchError::Query("Command contains no statements".into()));
        }

        let mut conn = self.conn.lock();
        let savepoint = conn
            .savepoint()
            .map_err(|e| map_sqlite_error("Failed to open savepoint", e))?;

        let mut affected_rows = 0u64;
        for statement in &statements {
            let mut stmt = savepoint
                .prepare(statement)
                .map_err(|e| map_sqlite_error("Failed to prepare statement", e))?;
            bind_by_name(&mut stmt, params)?;
            let changed = stmt
                .raw_execute()
                .map_err(|e| map_sqlite_error("Failed to execute statement", e))?;
            affected_rows += changed as u64;
        }
        savepoint
            .commit()
            .map_err(|e| map_sqlite_error("Failed to release savepoint", e))?;

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(
            affected_rows,
            statements = statements.len(),
            execution_time_ms,
            "command executed"
        );
        Ok(StatementResult {
            affected_rows,
            statement_count: statements.len(),
            execution_time_ms,
        })
    }

    fn cancel_handle(&self) -> Option<Arc<dyn QueryCancelHandle>> {
        Some(Arc::new(SqliteCancelHandle {
            interrupt_handle: self.interrupt_handle.clone(),
        }))
    }
}

/// Bind every `:name` / `@name` / `$name` parameter of `stmt` from `params`.
/// Parameters the statement does not use are ignored, so one list can serve
/// every statement of a compound command.
fn bind_by_name(stmt: &mut rusqlite::Statement<'_>, params: &[Parameter]) -> Result<()> {
    for index in 1..=stmt.parameter_count() {
        let param = {
            let name = stmt.parameter_name(index).ok_or_else(|| {
                SqlBatchError::Query(format!(
                    "Positional parameter ?{} is not supported, use named parameters",
                    index
                ))
            })?;
            let key = name.trim_start_matches([':', '@', '$']);
            params.iter().find(|p| p.name == key).ok_or_else(|| {
                SqlBatchError::Query(format!("No value supplied for parameter {}", name))
            })?
        };
        stmt.raw_bind_parameter(index, value_to_rusqlite(&param.value))
            .map_err(|e| map_sqlite_error("Failed to bind parameter", e))?;
    }
    Ok(())
}

fn map_sqlite_error(context: &str, error: rusqlite::Error) -> SqlBatchError {
    match &error {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::OperationInterrupted =>
        {
            SqlBatchError::Cancelled
        }
        _ => SqlBatchError::Query(format!("{}: {}", context, error)),
    }
}

fn value_to_rusqlite(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(b) => rusqlite::types::Value::Integer(if *b { 1 } else { 0 }),
        Value::Int16(i) => rusqlite::types::Value::Integer(*i as i64),
        Value::Int32(i) => rusqlite::types::Value::Integer(*i as i64),
        Value::Int64(i) => rusqlite::types::Value::Integer(*i),
        Value::Float32(f) => rusqlite::types::Value::Real(*f as f64),
        Value::Float64(f) => rusqlite::types::Value::Real(*f),
        Value::Decimal(d) => rusqlite::types::Value::Text(d.clone()),
        Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Bytes(b) => rusqlite::types::Value::Blob(b.clone()),
        Value::Date(d) => rusqlite::types::Value::Text(d.to_string()),
        Value::Time(t) => rusqlite::types::Value::Text(t.to_string()),
        Value::DateTime(dt) => rusqlite::types::Value::Text(dt.to_string()),
        Value::DateTimeUtc(dt) => rusqlite::types::Value::Text(dt.to_rfc3339()),
        Value::Json(j) => rusqlite::types::Value::Text(j.to_string()),
        Value::Uuid(u) => rusqlite::types::Value::Text(u.to_string()),
    }
}

fn rusqlite_to_value(row: &rusqlite::Row, idx: usize) -> Result<Value> {
    use rusqlite::types::ValueRef;

    let value_ref = row
        .get_ref(idx)
        .map_err(|e| SqlBatchError::Query(e.to_string()))?;

    Ok(match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path_keeps_uris() {
        assert_eq!(
            SqliteConnection::expand_path("file:test.db?mode=memory").unwrap(),
            "file:test.db?mode=memory"
        );
    }

    #[test]
    fn test_expand_path_makes_relative_absolute() {
        let expanded = SqliteConnection::expand_path("data/app.db").unwrap();
        assert!(std::path::Path::new(&expanded).is_absolute());
        assert!(expanded.ends_with("app.db"));
    }

    #[test]
    fn test_expand_path_rejects_other_users_home() {
        assert!(matches!(
            SqliteConnection::expand_path("~bob/app.db"),
            Err(SqlBatchError::Configuration(_))
        ));
    }

    #[test]
    fn test_interrupt_maps_to_cancelled() {
        let error = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_INTERRUPT),
            None,
        );
        assert!(matches!(
            map_sqlite_error("Failed to execute statement", error),
            SqlBatchError::Cancelled
        ));
    }
}
