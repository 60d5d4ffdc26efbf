//! PostgreSQL connection backend.

use crate::Connection;
use crate::error::{ErrorKind, Result, raise};
use crate::settings::PostgresSettings;
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::time::Duration;
use tabula_query::{Row, Value};
use tracing::instrument;

/// PostgreSQL connection backend.
///
/// Cheap to clone; clones share the underlying pool.
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    name: String,
    pool: PgPool,
}
impl PostgresBackend {
    /// Connect to the server described by `settings`.
    ///
    /// The first connection is established eagerly so that bad credentials
    /// surface at start-up rather than on the first query.
    #[instrument(skip_all, fields(host = %settings.hostname, database = %settings.database))]
    pub async fn connect(name: impl Into<String>, settings: &PostgresSettings) -> Result<Self> {
        let name = name.into();
        let options = PgConnectOptions::new()
            .host(&settings.hostname)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.database);
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await;
        Ok(Self { pool: raise(pool, &name)?, name })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        tracing::debug!(backend = %self.name, sql, "Executing statement");
        let rows = raise(sqlx::query(sql).persistent(false).fetch_all(&self.pool).await, &self.name)?;
        rows.iter().map(decode_row).collect()
    }
}

fn decode_row(row: &PgRow) -> Result<Row> {
    let mut record = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let decode_err = || ErrorKind::Decode(column.name().to_string());
        let raw = row.try_get_raw(index).or_raise(decode_err)?;
        if raw.is_null() {
            record.insert(column.name(), Value::Null);
            continue;
        }
        let value = match column.type_info().name() {
            "BOOL" => Value::Boolean(row.try_get::<bool, _>(index).or_raise(decode_err)?),
            "INT2" => Value::from(row.try_get::<i16, _>(index).or_raise(decode_err)?),
            "INT4" => Value::from(row.try_get::<i32, _>(index).or_raise(decode_err)?),
            "INT8" => Value::Integer(row.try_get::<i64, _>(index).or_raise(decode_err)?),
            "FLOAT4" => Value::from(row.try_get::<f32, _>(index).or_raise(decode_err)?),
            "FLOAT8" => Value::Float(row.try_get::<f64, _>(index).or_raise(decode_err)?),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => {
                Value::String(row.try_get::<String, _>(index).or_raise(decode_err)?)
            },
            // NUMERIC, temporal and other rich types need a cast to text in
            // the statement itself.
            _ => exn::bail!(decode_err()),
        };
        record.insert(column.name(), value);
    }
    Ok(record)
}

#[async_trait]
impl Connection for PostgresBackend {
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
