//! Cache key derivation.

use std::fmt;
use tabula_query::{Direction, LoadOptions, Record, Value};

/// Deterministic identifier for a cached read.
///
/// A key is the pair of a scope (the table name for loads, `<table>_count`
/// for counts) and a BLAKE3 digest of the filter set. Filters are hashed in
/// field-name order, so equivalent filter sets built in any order produce
/// the same key. Every field and value is length-prefixed and type-tagged,
/// so `{a: "1"}` and `{a: 1}` never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    scope: String,
    digest: String,
}
impl CacheKey {
    pub fn new(scope: impl Into<String>, filters: &Record) -> Self {
        let mut hasher = blake3::Hasher::new();
        hash_filters(&mut hasher, filters);
        Self { scope: scope.into(), digest: hasher.finalize().to_hex().to_string() }
    }

    /// Key for a load, which also depends on the trailing clauses: two pages
    /// of the same filter set are different reads.
    pub fn with_options(scope: impl Into<String>, filters: &Record, options: &LoadOptions) -> Self {
        let mut hasher = blake3::Hasher::new();
        hash_filters(&mut hasher, filters);
        hasher.update(b"options");
        hash_optional(&mut hasher, options.max_items);
        hash_optional(&mut hasher, options.offset);
        match &options.order_by {
            None => {
                hasher.update(&[0]);
            },
            Some(order) => {
                hasher.update(&[1, u8::from(order.direction == Direction::Desc)]);
                hasher.update(&(order.column.len() as u64).to_le_bytes());
                hasher.update(order.column.as_bytes());
            },
        }
        Self { scope: scope.into(), digest: hasher.finalize().to_hex().to_string() }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }
}
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.digest)
    }
}

fn hash_filters(hasher: &mut blake3::Hasher, filters: &Record) {
    let mut pairs: Vec<(&String, &Value)> = filters.iter().collect();
    pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));
    for (field, value) in pairs {
        hasher.update(&(field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
        match value {
            Value::Null => {
                hasher.update(&[0]);
            },
            Value::Boolean(b) => {
                hasher.update(&[1, u8::from(*b)]);
            },
            Value::Integer(i) => {
                hasher.update(&[2]);
                hasher.update(&i.to_le_bytes());
            },
            Value::Float(f) => {
                hasher.update(&[3]);
                hasher.update(&f.to_bits().to_le_bytes());
            },
            Value::String(s) => {
                hasher.update(&[4]);
                hasher.update(&(s.len() as u64).to_le_bytes());
                hasher.update(s.as_bytes());
            },
        }
    }
}

fn hash_optional(hasher: &mut blake3::Hasher, value: Option<u64>) {
    match value {
        None => hasher.update(&[0]),
        Some(value) => hasher.update(&[1]).update(&value.to_le_bytes()),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tabula_query::OrderBy;

    #[test]
    fn test_order_independent() {
        let left = Record::new().with("login", "tom").with("permissions", 3).with("active", true);
        let right = Record::new().with("active", true).with("login", "tom").with("permissions", 3);
        assert_eq!(CacheKey::new("users", &left), CacheKey::new("users", &right));
    }

    #[test]
    fn test_empty_filters_stable() {
        assert_eq!(CacheKey::new("users", &Record::new()), CacheKey::new("users", &Record::new()));
    }

    #[test]
    fn test_scope_changes_key() {
        let filters = Record::new().with("login", "tom");
        assert_ne!(CacheKey::new("users", &filters), CacheKey::new("users_count", &filters));
        // Scope is not part of the digest.
        assert_eq!(CacheKey::new("users", &filters).digest(), CacheKey::new("posts", &filters).digest());
    }

    #[rstest]
    #[case(Record::new().with("login", "tom"), Record::new().with("login", "tim"))]
    #[case(Record::new().with("id", 1), Record::new().with("id", "1"))]
    #[case(Record::new().with("id", 1), Record::new().with("id", 1.0))]
    #[case(Record::new().with("flag", true), Record::new().with("flag", 1))]
    #[case(Record::new().with("a", "bc"), Record::new().with("ab", "c"))]
    #[case(Record::new().with("a", 1), Record::new().with("a", 1).with("b", 2))]
    #[case(Record::new(), Record::new().with("deleted", Value::Null))]
    fn test_distinct_filters_distinct_keys(#[case] left: Record, #[case] right: Record) {
        assert_ne!(CacheKey::new("users", &left), CacheKey::new("users", &right));
    }

    #[test]
    fn test_options_change_key() {
        let filters = Record::new().with("login", "tom");
        let first = LoadOptions::default().limit(2);
        let second = LoadOptions::default().limit(2).offset(2);
        assert_ne!(
            CacheKey::with_options("users", &filters, &first),
            CacheKey::with_options("users", &filters, &second)
        );
    }

    #[rstest]
    #[case(LoadOptions::default(), LoadOptions::default().limit(10))]
    #[case(LoadOptions::default().limit(10), LoadOptions::default().offset(10))]
    #[case(LoadOptions::default().order_by(OrderBy::asc("id")), LoadOptions::default().order_by(OrderBy::desc("id")))]
    #[case(LoadOptions::default().order_by(OrderBy::asc("id")), LoadOptions::default().order_by(OrderBy::asc("name")))]
    fn test_distinct_options_distinct_keys(#[case] left: LoadOptions, #[case] right: LoadOptions) {
        let filters = Record::new();
        let left = CacheKey::with_options("users", &filters, &left);
        assert_ne!(left, CacheKey::with_options("users", &filters, &right));
    }

    #[test]
    fn test_options_key_order_independent() {
        let left = Record::new().with("login", "tom").with("permissions", 3);
        let right = Record::new().with("permissions", 3).with("login", "tom");
        let options = LoadOptions::default().order_by(OrderBy::desc("id")).limit(5).offset(5);
        let left = CacheKey::with_options("users", &left, &options);
        assert_eq!(left, CacheKey::with_options("users", &right, &options));
    }

    #[test]
    fn test_display() {
        let key = CacheKey::new("users", &Record::new());
        let rendered = key.to_string();
        assert!(rendered.starts_with("users:"));
        assert_eq!(rendered.len(), "users:".len() + 64);
    }
}
