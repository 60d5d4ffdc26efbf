//! Persistent cache stored in SQLite.
//!
//! Entries are stored as JSON documents keyed by `(scope, digest)`, so a
//! scope can be invalidated with a single indexed delete.

use crate::db::Database;
use crate::error::{ErrorKind, Result};
use crate::key::CacheKey;
use crate::strategy::{CacheEntry, CacheStrategy};
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::SqlitePool;
use time::UtcDateTime;

/// SQLite cache backend.
///
/// Survives process restarts and can be shared by several processes
/// pointing at the same file.
#[derive(Debug, Clone)]
pub struct SqliteCache {
    name: String,
    pool: SqlitePool,
}
impl From<&Database> for SqliteCache {
    fn from(db: &Database) -> Self {
        Self { name: "sqlite".to_string(), pool: db.pool().clone() }
    }
}
impl SqliteCache {
    /// Delete entries cached more than `age` ago, returning how many were removed.
    pub async fn purge_older_than(&self, age: time::Duration) -> Result<u64> {
        let cutoff = (UtcDateTime::now() - age).unix_timestamp();
        let result = sqlx::query(include_str!("../queries/delete_older_than.sql"))
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CacheStrategy for SqliteCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let document: Option<String> = sqlx::query_scalar(include_str!("../queries/get_entry.sql"))
            .bind(key.scope())
            .bind(key.digest())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        document
            .map(|json| serde_json::from_str(&json).or_raise(|| ErrorKind::InvalidData("cache entry")))
            .transpose()
    }

    async fn set(&self, key: CacheKey, entry: CacheEntry) -> Result<()> {
        let document = serde_json::to_string(&entry).or_raise(|| ErrorKind::InvalidData("cache entry"))?;
        sqlx::query(include_str!("../queries/upsert_entry.sql"))
            .bind(key.scope())
            .bind(key.digest())
            .bind(document)
            .bind(UtcDateTime::now().unix_timestamp())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn invalidate(&self, scope: &str) -> Result<u64> {
        let result = sqlx::query(include_str!("../queries/delete_scope.sql"))
            .bind(scope)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::debug!(cache = %self.name, scope, removed = result.rows_affected(), "Invalidated cache scope");
        Ok(result.rows_affected())
    }
}
