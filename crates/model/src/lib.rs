//! Table models.
//!
//! A [`Model`] maps one database table: it turns field mappings into SQL
//! text with `tabula-query`, answers repeated reads from a
//! [`CacheStrategy`](tabula_cache::CacheStrategy), and sends everything else
//! through the [`Connection`](tabula_connection::Connection) that the
//! connection factory resolves for the model's backend.
//!
//! Neither the cache nor the factory is owned by a model: both are shared
//! handles, so every model of a process sees the same cached reads and the
//! same connection pools.

pub mod error;
mod model;
mod options;

pub use crate::model::Model;
pub use crate::options::{DEFAULT_BACKEND, ModelOptions};
pub use tabula_query::{Direction, LoadOptions, OrderBy, Record, Row, Value};
