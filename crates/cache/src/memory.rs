//! In-process cache.

use crate::error::Result;
use crate::key::CacheKey;
use crate::strategy::{CacheEntry, CacheStrategy};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory cache backend.
///
/// Entries live in a `HashMap` behind a [`RwLock`], so all trait methods
/// operate on `&self` without external synchronisation. Nothing is evicted;
/// entries disappear only through [`invalidate`](CacheStrategy::invalidate).
pub struct MemoryCache {
    name: String,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}
impl MemoryCache {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), entries: RwLock::new(HashMap::new()) }
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
impl Default for MemoryCache {
    fn default() -> Self {
        Self::new("memory")
    }
}

#[async_trait]
impl CacheStrategy for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: CacheKey, entry: CacheEntry) -> Result<()> {
        self.entries.write().await.insert(key, entry);
        Ok(())
    }

    async fn invalidate(&self, scope: &str) -> Result<u64> {
        let mut guard = self.entries.write().await;
        let before = guard.len();
        guard.retain(|key, _| key.scope() != scope);
        let removed = (before - guard.len()) as u64;
        tracing::debug!(cache = %self.name, scope, removed, "Invalidated cache scope");
        Ok(removed)
    }
}
