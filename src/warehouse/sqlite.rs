//! SQLite warehouse backend
//!
//! Reads the same `owid_covid2`-shaped table from a local SQLite file.
//! Used for local runs without warehouse credentials and by the test suite.

use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags, ToSql};
use std::path::Path;
use std::sync::Mutex;

use super::error::{WarehouseError, WarehouseResult};
use super::types::{RowSet, Value};
use super::Warehouse;

/// Warehouse backed by a single SQLite connection
pub struct SqliteWarehouse {
    /// std::sync::Mutex because rusqlite::Connection is !Sync
    conn: Mutex<Connection>,
    label: String,
}

impl SqliteWarehouse {
    /// Open an existing SQLite file read-only
    pub fn open(path: &Path) -> WarehouseResult<Self> {
        if !path.exists() {
            return Err(WarehouseError::Connection(format!(
                "SQLite database {:?} does not exist",
                path
            )));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| WarehouseError::Connection(e.to_string()))?;

        tracing::info!(path = ?path, "Opened SQLite warehouse");

        Ok(Self {
            conn: Mutex::new(conn),
            label: format!("sqlite:{}", path.display()),
        })
    }

    /// Wrap an already-open connection (in-memory databases in tests)
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            label: "sqlite::memory:".to_string(),
        }
    }

    /// Open an empty in-memory database
    pub fn in_memory() -> WarehouseResult<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    /// Run a batch of statements (fixtures and local setup)
    pub fn execute_batch(&self, sql: &str) -> WarehouseResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| WarehouseError::Lock(e.to_string()))?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn run(&self, sql: &str, params: &[Value]) -> WarehouseResult<RowSet> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| WarehouseError::Lock(e.to_string()))?;

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| WarehouseError::Query(e.to_string()))?;

        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let mut rows = stmt
            .query(params_from_iter(params.iter().map(SqlParam)))
            .map_err(|e| WarehouseError::Query(e.to_string()))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(from_sql(row.get_ref(i)?)?);
            }
            out.push(values);
        }

        Ok(RowSet::new(columns, out))
    }
}

#[async_trait]
impl Warehouse for SqliteWarehouse {
    fn name(&self) -> &str {
        &self.label
    }

    async fn query(&self, sql: &str, params: &[Value]) -> WarehouseResult<RowSet> {
        self.run(sql, params)
    }
}

/// Adapter so `Value` can be bound as a positional parameter
struct SqlParam<'a>(&'a Value);

impl ToSql for SqlParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Value::Null => ToSqlOutput::from(rusqlite::types::Null),
            Value::Int(v) => ToSqlOutput::from(*v),
            Value::Float(v) => ToSqlOutput::from(*v),
            Value::Date(d) => ToSqlOutput::from(d.format("%Y-%m-%d").to_string()),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

fn from_sql(value: ValueRef<'_>) -> WarehouseResult<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Int(v),
        ValueRef::Real(v) => Value::Float(v),
        ValueRef::Text(bytes) => Value::Text(
            std::str::from_utf8(bytes)
                .map_err(|e| WarehouseError::Decode(e.to_string()))?
                .to_string(),
        ),
        ValueRef::Blob(_) => {
            return Err(WarehouseError::Decode(
                "BLOB columns are not supported".to_string(),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> SqliteWarehouse {
        let wh = SqliteWarehouse::in_memory().unwrap();
        wh.execute_batch(
            "CREATE TABLE t (location TEXT, date TEXT, new_cases REAL);
             INSERT INTO t VALUES ('France', '2021-01-01', 10.0);
             INSERT INTO t VALUES ('France', '2021-01-02', NULL);
             INSERT INTO t VALUES ('Chad', '2021-01-01', 3.0);",
        )
        .unwrap();
        wh
    }

    #[tokio::test]
    async fn test_query_with_params() {
        let wh = fixture();
        let set = wh
            .query(
                "SELECT date, new_cases FROM t WHERE location = ? ORDER BY date",
                &[Value::from("France")],
            )
            .await
            .unwrap();

        assert_eq!(set.columns, vec!["date", "new_cases"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.rows[0][1].as_i64(), Some(10));
        assert!(set.rows[1][1].is_null());
    }

    #[tokio::test]
    async fn test_bad_sql_is_query_error() {
        let wh = fixture();
        let err = wh.query("SELECT nope FROM missing", &[]).await.unwrap_err();
        assert!(matches!(err, WarehouseError::Query(_)));
    }

    #[test]
    fn test_open_missing_file() {
        let err = SqliteWarehouse::open(Path::new("/definitely/not/here.db"))
            .err()
            .unwrap();
        assert!(matches!(err, WarehouseError::Connection(_)));
    }
}
