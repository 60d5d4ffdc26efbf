//! Connection Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Driver errors are kept as the child
//! frame of the classified [`ErrorKind`].

use derive_more::{Display, Error};
use exn::ResultExt;

/// A connection error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for connection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The backend could not be reached (network, TLS, closed pool).
    #[display("connection to {_0} failed")]
    Connection(#[error(not(source))] String),
    /// The backend rejected the statement.
    #[display("statement rejected by {_0}")]
    Query(#[error(not(source))] String),
    /// Unique, foreign key or check constraint violation.
    #[display("constraint violation on {_0}")]
    Constraint(#[error(not(source))] String),
    /// No pooled connection became available in time.
    #[display("timed out waiting for {_0}")]
    Timeout(#[error(not(source))] String),
    /// A result column has a type that cannot be mapped to a value.
    #[display("cannot decode column {_0:?}")]
    Decode(#[error(not(source))] String),
    /// A mutating statement was sent to a read-only backend and not applied.
    #[display("backend {_0} is read-only")]
    ReadOnly(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }

    /// Classify a driver error raised while talking to `backend`.
    pub fn classify(err: &sqlx::Error, backend: &str) -> Self {
        let backend = backend.to_string();
        match err {
            sqlx::Error::Database(db)
                if db.is_unique_violation() || db.is_foreign_key_violation() || db.is_check_violation() =>
            {
                Self::Constraint(backend)
            },
            sqlx::Error::PoolTimedOut => Self::Timeout(backend),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_) => Self::Connection(backend),
            sqlx::Error::ColumnDecode { index, .. } => Self::Decode(index.clone()),
            sqlx::Error::ColumnNotFound(column) => Self::Decode(column.clone()),
            _ => Self::Query(backend),
        }
    }
}

/// Raise a driver result into a classified connection error.
pub(crate) fn raise<T>(result: std::result::Result<T, sqlx::Error>, backend: &str) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(err) => {
            let kind = ErrorKind::classify(&err, backend);
            Err(err).or_raise(|| kind)
        },
    }
}
