//! Connections that execute generated SQL.
//!
//! - [`Connection`]: executes SQL text and returns decoded rows.
//! - [`ConnectionFactory`]: resolves a backend identifier to a connection;
//!   [`Registry`] is the standard implementation.
//! - [`backend`]: SQLite (always), PostgreSQL (feature `postgres`), a
//!   read-only wrapper, and a scripted mock (feature `mock`).

pub mod backend;
pub mod error;
mod factory;
mod settings;

pub use crate::backend::Connection;
pub use crate::factory::{ConnectionFactory, Registry};
pub use crate::settings::{PostgresSettings, SqliteSettings};
use std::sync::Arc;

pub type ConnectionHandle = Arc<dyn Connection + Send + Sync>;
pub type FactoryHandle = Arc<dyn ConnectionFactory + Send + Sync>;
