//! The cache strategy contract shared by all cache backends.

use crate::error::Result;
use crate::key::CacheKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tabula_query::{LoadOptions, Record, Row};

/// A cached read result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CacheEntry {
    /// Rows returned by a load.
    Rows(Vec<Row>),
    /// Result of a count.
    Count(u64),
}
impl CacheEntry {
    pub fn into_rows(self) -> Option<Vec<Row>> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Count(_) => None,
        }
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            Self::Count(count) => Some(*count),
            Self::Rows(_) => None,
        }
    }
}

/// Stores and retrieves previously computed read results.
///
/// Implementations are shared process-wide behind a [`CacheHandle`], so all
/// methods take `&self`. Concurrent writes to the same key are
/// last-write-wins; there is no expiry.
///
/// # Examples
///
/// ```
/// use tabula_cache::{CacheEntry, CacheStrategy, MemoryCache};
/// use tabula_query::Record;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = MemoryCache::default();
/// let key = cache.key("users_count", &Record::new());
/// assert!(cache.get(&key).await?.is_none());
/// cache.set(key.clone(), CacheEntry::Count(3)).await?;
/// assert_eq!(cache.get(&key).await?, Some(CacheEntry::Count(3)));
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait CacheStrategy: Send + Sync {
    /// Name of the cache backend (used for logging only).
    fn name(&self) -> &str;

    /// Derive the key for a read of `scope` with the given filters.
    fn key(&self, scope: &str, filters: &Record) -> CacheKey {
        CacheKey::new(scope, filters)
    }

    /// Derive the key for a load of `scope`, which also covers ordering and
    /// paging.
    fn load_key(&self, scope: &str, filters: &Record, options: &LoadOptions) -> CacheKey {
        CacheKey::with_options(scope, filters, options)
    }

    /// Fetch an entry; `None` when the key has never been set (or was
    /// invalidated).
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Store an entry, replacing any previous entry under the same key.
    async fn set(&self, key: CacheKey, entry: CacheEntry) -> Result<()>;

    /// Drop every entry stored under `scope`, returning how many were removed.
    async fn invalidate(&self, scope: &str) -> Result<u64>;
}
