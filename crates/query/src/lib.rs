//! SQL text synthesis for table models.
//!
//! This crate turns field mappings into literal SQL statements:
//!
//! - [`Value`] and [`Record`] describe scalar values and ordered field sets
//!   (filters, insert/update data and result rows all share the type).
//! - [`Insert`], [`Update`], [`Delete`], [`Select`] and [`Count`] are
//!   structured statements that validate on construction and render via
//!   [`Display`](std::fmt::Display).
//! - [`escape`] sanitises string literals; identifiers are validated rather
//!   than escaped.
//! - [`random_string`] produces URL-safe tokens for salts and the like.
//!
//! All string values, including filter values, are escaped the same way.

pub mod error;
mod escape;
mod random;
mod statement;
mod value;

pub use crate::escape::{escape, validate_identifier};
pub use crate::random::{ALPHABET, TOKEN_LENGTH, random_string};
pub use crate::statement::{
    Count, Delete, Direction, Insert, LoadOptions, OrderBy, Predicate, Select, Table, Update,
};
pub use crate::value::{Literal, Record, Value};

/// A single result row.
pub type Row = Record;
