//! Read-result caching for table models.
//!
//! Loads and counts can be short-circuited through a [`CacheStrategy`]: the
//! model derives a [`CacheKey`] from the table scope and filter set, checks
//! for a stored [`CacheEntry`], and only on a miss goes to the database.
//!
//! # Backends
//! - [`MemoryCache`]: process-local `HashMap`, the default.
//! - [`SqliteCache`]: persistent, stored in a small SQLite database managed
//!   by [`Database`] (embedded migrations run on connect).

mod db;
pub mod error;
mod key;
mod memory;
mod sqlite;
mod strategy;

pub use crate::db::Database;
pub use crate::key::CacheKey;
pub use crate::memory::MemoryCache;
pub use crate::sqlite::SqliteCache;
pub use crate::strategy::{CacheEntry, CacheStrategy};
use std::sync::Arc;

pub type CacheHandle = Arc<dyn CacheStrategy + Send + Sync>;
