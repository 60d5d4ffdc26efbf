//! String literal and identifier sanitising.

use crate::error::{ErrorKind, Result};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Plain identifier, optionally schema-qualified (`schema.table`).
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").unwrap());

/// Escape a string for embedding between single quotes in SQL text.
///
/// Single quotes are doubled (standard SQL) and NUL bytes are dropped, as
/// PostgreSQL refuses them in text literals. Returns the input untouched
/// when nothing needs escaping.
///
/// ```
/// use tabula_query::escape;
/// assert_eq!(escape("plain"), "plain");
/// assert_eq!(escape("it's"), "it''s");
/// ```
pub fn escape(value: &str) -> Cow<'_, str> {
    if !value.contains(['\'', '\0']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\'' => escaped.push_str("''"),
            '\0' => {},
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Validates a table or column name.
///
/// Identifiers are interpolated verbatim into statements, so anything that
/// is not a plain (optionally schema-qualified) name is rejected with
/// [`InvalidIdentifier`](ErrorKind::InvalidIdentifier).
pub fn validate_identifier(name: &str) -> Result<&str> {
    match IDENTIFIER.is_match(name) {
        true => Ok(name),
        false => exn::bail!(ErrorKind::InvalidIdentifier(name.to_string())),
    }
}
