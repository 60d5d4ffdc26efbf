//! Config Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A configuration source could not be read or parsed.
    #[display("could not load configuration from {_0}")]
    Load(#[error(not(source))] String),
    /// The merged configuration is inconsistent.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    /// A configured backend could not be connected.
    #[display("could not connect backend {_0}")]
    Backend(#[error(not(source))] String),
    /// The backend kind is not compiled into this build.
    #[display("backend kind {_0} is not supported by this build")]
    Unsupported(#[error(not(source))] String),
    #[display("could not open cache")]
    Cache,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Cache)
    }
}
