//! Query Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A query building error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for query building operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Every variant is a caller contract violation: the statement is rejected
/// before any SQL text is produced.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Table, column or field name is not a plain SQL identifier.
    #[display("invalid identifier: {_0:?}")]
    InvalidIdentifier(#[error(not(source))] String),
    /// Update or remove without an `id` field.
    #[display("missing id field")]
    MissingId,
    /// The `id` field is present but is not an integer.
    #[display("invalid id: {_0}")]
    InvalidId(#[error(not(source))] String),
    /// Update with nothing to set besides the `id`.
    #[display("update has no fields to set")]
    EmptyUpdate,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
