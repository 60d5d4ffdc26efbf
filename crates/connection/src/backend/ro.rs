//! Read-only connection wrapper.
//!
//! Wraps another connection and refuses mutating statements before they reach
//! the database.

use async_trait::async_trait;
use tabula_query::Row;

use crate::error::{ErrorKind, Result};
use crate::{Connection, ConnectionHandle};

/// Read-only connection backend.
///
/// Reads pass through to the wrapped connection. Mutating statements are
/// logged as an [`info event`](tracing::Event) and rejected with
/// [`ErrorKind::ReadOnly`], so callers never mistake them for applied writes.
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: ConnectionHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: ConnectionHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Connection for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn select(&self, sql: &str) -> Result<Vec<Row>> {
        self.inner.select(sql).await
    }

    async fn insert(&self, sql: &str) -> Result<Vec<Row>> {
        tracing::info!(backend = self.inner.name(), sql, "Refusing mutating statement in read-only mode");
        exn::bail!(ErrorKind::ReadOnly(self.inner.name().to_string()))
    }
}
