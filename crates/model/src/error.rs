//! Model Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. The failure raised by the query
//! builder, connection or cache is kept as the child frame.

use derive_more::{Display, Error};
use exn::ResultExt;

/// A model error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request could not be turned into a statement (bad identifier,
    /// missing or invalid id). Nothing was sent to the database.
    #[display("invalid request for table {_0}")]
    Query(#[error(not(source))] String),
    /// The backend failed to execute the statement.
    #[display("backend {backend} failed")]
    Connection {
        #[error(not(source))]
        backend: String,
        #[error(not(source))]
        retryable: bool,
    },
    #[display("cache error")]
    Cache,
    /// An insert succeeded but returned no `id` column.
    #[display("insert into {_0} returned no id")]
    MissingReturnedId(#[error(not(source))] String),
    /// A count query answered with something other than a non-negative integer.
    #[display("count of {_0} is not a number")]
    InvalidCount(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { retryable, .. } => *retryable,
            Self::Cache => true,
            Self::Query(_) | Self::MissingReturnedId(_) | Self::InvalidCount(_) => false,
        }
    }
}

/// Raise a connection result, carrying over whether the backend considered
/// the failure transient.
pub(crate) fn raise_connection<T>(result: tabula_connection::error::Result<T>, backend: &str) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(err) => {
            let kind = ErrorKind::Connection { backend: backend.to_string(), retryable: err.is_retryable() };
            Err(err).or_raise(|| kind)
        },
    }
}
