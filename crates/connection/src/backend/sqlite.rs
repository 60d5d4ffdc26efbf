//! SQLite connection backend.

use crate::Connection;
use crate::error::{ErrorKind, Result, raise};
use crate::settings::SqliteSettings;
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::path::Path;
use std::time::Duration;
use tabula_query::{Row, Value};
use tracing::instrument;

/// SQLite connection backend.
///
/// Cheap to clone; clones share the underlying pool.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    name: String,
    pool: SqlitePool,
}
impl SqliteBackend {
    /// Connect using configuration settings, falling back to an in-memory
    /// database when no path is set.
    pub async fn from_settings(name: impl Into<String>, settings: &SqliteSettings) -> Result<Self> {
        match &settings.path {
            Some(path) => Self::connect(name, path, settings.max_connections).await,
            None => Self::connect_in_memory(name).await,
        }
    }

    /// Open (or create) the database file at `path`.
    pub async fn connect(name: impl Into<String>, path: impl AsRef<Path>, max_connections: u32) -> Result<Self> {
        let name = name.into();
        let options = Self::base_options().filename(path.as_ref()).create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await;
        Ok(Self { pool: raise(pool, &name)?, name })
    }

    /// Open a private in-memory database.
    ///
    /// The pool holds exactly one connection which is never recycled: the
    /// database lives exactly as long as that connection.
    #[instrument(skip_all)]
    pub async fn connect_in_memory(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let options = Self::base_options().filename(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await;
        Ok(Self { pool: raise(pool, &name)?, name })
    }

    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new().foreign_keys(true).busy_timeout(Duration::from_millis(1500))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        tracing::debug!(backend = %self.name, sql, "Executing statement");
        // Generated statements embed their literals; caching each one as a
        // prepared statement would only churn the statement cache.
        let rows = raise(sqlx::query(sql).persistent(false).fetch_all(&self.pool).await, &self.name)?;
        rows.iter().map(decode_row).collect()
    }
}

fn decode_row(row: &SqliteRow) -> Result<Row> {
    let mut record = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let decode_err = || ErrorKind::Decode(column.name().to_string());
        let raw = row.try_get_raw(index).or_raise(decode_err)?;
        // Value-level type info reports the storage class of this value,
        // not the declared column type.
        let value = match raw.is_null() {
            true => Value::Null,
            false => match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => Value::Integer(row.try_get::<i64, _>(index).or_raise(decode_err)?),
                "REAL" => Value::Float(row.try_get::<f64, _>(index).or_raise(decode_err)?),
                "TEXT" | "DATE" | "TIME" | "DATETIME" => {
                    Value::String(row.try_get::<String, _>(index).or_raise(decode_err)?)
                },
                _ => exn::bail!(decode_err()),
            },
        };
        record.insert(column.name(), value);
    }
    Ok(record)
}

#[async_trait]
impl Connection for SqliteBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn select(&self, sql: &str) -> Result<Vec<Row>> {
        self.execute(sql).await
    }

    async fn insert(&self, sql: &str) -> Result<Vec<Row>> {
        self.execute(sql).await
    }
}
