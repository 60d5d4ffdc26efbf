//! Backend and cache sections.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tabula_cache::{CacheHandle, Database, MemoryCache, SqliteCache};
use tabula_connection::backend::{ReadOnlyBackend, SqliteBackend};
use tabula_connection::{ConnectionHandle, PostgresSettings, SqliteSettings};

/// One entry of the `[backends]` table, keyed by its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    Sqlite {
        #[serde(flatten)]
        settings: SqliteSettings,
        #[serde(default)]
        read_only: bool,
    },
    Postgres {
        #[serde(flatten)]
        settings: PostgresSettings,
        #[serde(default)]
        read_only: bool,
    },
}
impl BackendConfig {
    pub fn read_only(&self) -> bool {
        match self {
            Self::Sqlite { read_only, .. } | Self::Postgres { read_only, .. } => *read_only,
        }
    }

    pub(crate) fn max_connections(&self) -> u32 {
        match self {
            Self::Sqlite { settings, .. } => settings.max_connections,
            Self::Postgres { settings, .. } => settings.max_connections,
        }
    }

    /// Open the backend, registered under `name`.
    pub async fn connect(&self, name: &str) -> Result<ConnectionHandle> {
        let backend_err = || ErrorKind::Backend(name.to_string());
        let connection: ConnectionHandle = match self {
            Self::Sqlite { settings, .. } => {
                Arc::new(SqliteBackend::from_settings(name, settings).await.or_raise(backend_err)?)
            },
            #[cfg(feature = "postgres")]
            Self::Postgres { settings, .. } => Arc::new(
                tabula_connection::backend::PostgresBackend::connect(name, settings).await.or_raise(backend_err)?,
            ),
            #[cfg(not(feature = "postgres"))]
            Self::Postgres { .. } => exn::bail!(ErrorKind::Unsupported("postgres".to_string())),
        };
        match self.read_only() {
            true => {
                tracing::info!(backend = name, "Backend is read-only; writes will be refused");
                Ok(Arc::new(ReadOnlyBackend::new(connection)))
            },
            false => Ok(connection),
        }
    }
}
impl Default for BackendConfig {
    fn default() -> Self {
        Self::Sqlite { settings: SqliteSettings::default(), read_only: false }
    }
}

/// The `[cache]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CacheConfig {
    #[default]
    Memory,
    Sqlite {
        /// Cache database file; a private in-memory database when omitted.
        #[serde(default)]
        path: Option<PathBuf>,
    },
}
impl CacheConfig {
    pub async fn open(&self) -> Result<CacheHandle> {
        match self {
            Self::Memory => Ok(Arc::new(MemoryCache::default())),
            Self::Sqlite { path } => {
                let db = match path {
                    Some(path) => Database::connect(path).await,
                    None => Database::connect_in_memory().await,
                };
                let db = db.or_raise(|| ErrorKind::Cache)?;
                Ok(Arc::new(SqliteCache::from(&db)))
            },
        }
    }
}
