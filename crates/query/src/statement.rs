//! Structured SQL statement builders.
//!
//! Each builder validates its inputs on construction and renders SQL text
//! through [`Display`](std::fmt::Display), so a successfully built statement
//! always lowers to a complete, `;`-terminated string:
//!
//! ```
//! use tabula_query::{Insert, Record, Table};
//!
//! let users = Table::new("users").unwrap();
//! let data = Record::new().with("login", "a").with("password", "b");
//! let insert = Insert::new(&users, &data).unwrap();
//! assert_eq!(insert.to_string(), "INSERT INTO users(login,password) VALUES('a','b') RETURNING id;");
//! ```
//!
//! Every read statement shares one [`Predicate`], so [`Select`] and
//! [`Count`] always agree on which rows match a filter set.

use crate::error::{ErrorKind, Result};
use crate::escape::validate_identifier;
use crate::value::{Record, Value};
use std::fmt;

/// A validated table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Table(String);
impl Table {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_identifier(&name)?;
        Ok(Self(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn require_id(data: &Record) -> Result<i64> {
    let Some(id) = data.id() else {
        exn::bail!(ErrorKind::MissingId);
    };
    match id.as_i64() {
        Some(id) => Ok(id),
        None => exn::bail!(ErrorKind::InvalidId(id.literal().to_string())),
    }
}

fn validate_fields(record: &Record) -> Result<()> {
    for field in record.keys() {
        validate_identifier(field)?;
    }
    Ok(())
}

/// The `WHERE` predicate built from a filter set.
///
/// Each filter becomes `field = literal`, joined with `AND`. Filters with a
/// [`Null`](Value::Null) value are not valid constraints and are skipped.
/// With no remaining constraints the predicate is the literal `TRUE`.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    clauses: Vec<(String, Value)>,
}
impl Predicate {
    pub fn from_filters(filters: &Record) -> Result<Self> {
        validate_fields(filters)?;
        let clauses = filters
            .iter()
            .filter(|(field, value)| {
                if value.is_null() {
                    tracing::debug!(field = %field, "Skipping null filter");
                }
                !value.is_null()
            })
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();
        Ok(Self { clauses })
    }

    /// Whether this predicate matches every row.
    pub fn is_match_all(&self) -> bool {
        self.clauses.is_empty()
    }
}
impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return f.write_str("TRUE");
        }
        for (position, (field, value)) in self.clauses.iter().enumerate() {
            if position > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{field} = {}", value.literal())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}
impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}
impl OrderBy {
    pub fn new(column: impl Into<String>, direction: Direction) -> Self {
        Self { column: column.into(), direction }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, Direction::Asc)
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, Direction::Desc)
    }
}

/// Optional trailing clauses of a load.
///
/// Rendered in the fixed order `ORDER BY`, `LIMIT`, `OFFSET`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub max_items: Option<u64>,
    pub order_by: Option<OrderBy>,
    pub offset: Option<u64>,
}
impl LoadOptions {
    pub fn limit(mut self, max_items: u64) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// `INSERT INTO <table>(f1,f2) VALUES(v1,v2) RETURNING id;`
///
/// The `id` column is left to the store's default. Empty data inserts a row
/// made entirely of defaults.
#[derive(Debug)]
pub struct Insert<'a> {
    table: &'a Table,
    data: &'a Record,
}
impl<'a> Insert<'a> {
    pub fn new(table: &'a Table, data: &'a Record) -> Result<Self> {
        validate_fields(data)?;
        Ok(Self { table, data })
    }
}
impl fmt::Display for Insert<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.data.is_empty() {
            return write!(f, "INSERT INTO {} DEFAULT VALUES RETURNING id;", self.table);
        }
        write!(f, "INSERT INTO {}(", self.table)?;
        for (position, field) in self.data.keys().enumerate() {
            if position > 0 {
                f.write_str(",")?;
            }
            f.write_str(field)?;
        }
        f.write_str(") VALUES(")?;
        for (position, (_, value)) in self.data.iter().enumerate() {
            if position > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", value.literal())?;
        }
        f.write_str(") RETURNING id;")
    }
}

/// `UPDATE <table> SET f1 = v1, f2 = v2 WHERE id = <id>;`
///
/// The integer `id` field is mandatory and is only used in the `WHERE`
/// clause, so an unbounded update can never be produced.
#[derive(Debug)]
pub struct Update<'a> {
    table: &'a Table,
    id: i64,
    data: &'a Record,
}
impl<'a> Update<'a> {
    pub fn new(table: &'a Table, data: &'a Record) -> Result<Self> {
        let id = require_id(data)?;
        if data.keys().all(|field| field == "id") {
            exn::bail!(ErrorKind::EmptyUpdate);
        }
        validate_fields(data)?;
        Ok(Self { table, id, data })
    }

    pub fn id(&self) -> i64 {
        self.id
    }
}
impl fmt::Display for Update<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UPDATE {} SET ", self.table)?;
        let assignments = self.data.iter().filter(|(field, _)| field.as_str() != "id");
        for (position, (field, value)) in assignments.enumerate() {
            if position > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field} = {}", value.literal())?;
        }
        write!(f, " WHERE id = {};", self.id)
    }
}

/// `DELETE FROM <table> WHERE id = <id>;`
#[derive(Debug)]
pub struct Delete<'a> {
    table: &'a Table,
    id: i64,
}
impl<'a> Delete<'a> {
    pub fn new(table: &'a Table, data: &Record) -> Result<Self> {
        Ok(Self { table, id: require_id(data)? })
    }

    pub fn id(&self) -> i64 {
        self.id
    }
}
impl fmt::Display for Delete<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DELETE FROM {} WHERE id = {};", self.table, self.id)
    }
}

/// `SELECT * FROM <table> WHERE <predicate>[ ORDER BY ..][ LIMIT ..][ OFFSET ..];`
#[derive(Debug)]
pub struct Select<'a> {
    table: &'a Table,
    predicate: Predicate,
    options: &'a LoadOptions,
}
impl<'a> Select<'a> {
    pub fn new(table: &'a Table, filters: &Record, options: &'a LoadOptions) -> Result<Self> {
        if let Some(order) = &options.order_by {
            validate_identifier(&order.column)?;
        }
        Ok(Self { table, predicate: Predicate::from_filters(filters)?, options })
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}
impl fmt::Display for Select<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT * FROM {} WHERE {}", self.table, self.predicate)?;
        if let Some(order) = &self.options.order_by {
            write!(f, " ORDER BY {} {}", order.column, order.direction)?;
        }
        if let Some(limit) = self.options.max_items {
            write!(f, " LIMIT {limit}")?;
        }
        if let Some(offset) = self.options.offset {
            write!(f, " OFFSET {offset}")?;
        }
        f.write_str(";")
    }
}

/// `SELECT COUNT(*) FROM <table> WHERE <predicate>;`
#[derive(Debug)]
pub struct Count<'a> {
    table: &'a Table,
    predicate: Predicate,
}
impl<'a> Count<'a> {
    pub fn new(table: &'a Table, filters: &Record) -> Result<Self> {
        Ok(Self { table, predicate: Predicate::from_filters(filters)? })
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}
impl fmt::Display for Count<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT COUNT(*) FROM {} WHERE {};", self.table, self.predicate)
    }
}
