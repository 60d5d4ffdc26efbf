//! Connection trait and implementations.
//!
//! A [`Connection`] executes finished SQL text and hands back the resulting
//! rows. Statement building happens entirely in the model layer, so a
//! backend only needs to ship text to its database and decode whatever comes
//! back into [`Row`]s.

#[cfg(any(test, feature = "mock"))]
mod mock;
#[cfg(feature = "postgres")]
mod postgres;
mod ro;
mod sqlite;

#[cfg(any(test, feature = "mock"))]
pub use self::mock::{MockBackend, Operation};
#[cfg(feature = "postgres")]
pub use self::postgres::PostgresBackend;
pub use self::ro::ReadOnlyBackend;
pub use self::sqlite::SqliteBackend;
use crate::error::Result;
use async_trait::async_trait;
use tabula_query::Row;

/// Executes SQL text against a database.
///
/// Both operations resolve exactly once: with the (possibly empty) rows the
/// statement produced, or with a classified [`Error`](crate::error::Error).
/// Failures are never reported as an empty result.
///
/// # Examples
///
/// ```
/// use tabula_connection::{Connection, error::Result};
///
/// async fn user_count(connection: &dyn Connection) -> Result<usize> {
///     let rows = connection.select("SELECT * FROM users WHERE TRUE;").await?;
///     Ok(rows.len())
/// }
/// ```
#[async_trait]
pub trait Connection: Send + Sync {
    /// Backend identifier this connection is registered under (taken from
    /// the configuration key). Used for backend selection and logging.
    fn name(&self) -> &str;

    /// Execute a read statement.
    async fn select(&self, sql: &str) -> Result<Vec<Row>>;

    /// Execute a mutating statement (insert, update or delete), returning
    /// any rows it produced (e.g. via `RETURNING`).
    async fn insert(&self, sql: &str) -> Result<Vec<Row>>;
}
