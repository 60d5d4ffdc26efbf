//! Backend connection settings.
//!
//! These are plain data so they can be deserialized by the configuration
//! layer whether or not the matching backend is compiled in.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_max_connections() -> u32 {
    5
}

fn default_port() -> u16 {
    5432
}

/// Settings for an SQLite backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteSettings {
    /// Database file; an in-memory database when omitted.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}
impl Default for SqliteSettings {
    fn default() -> Self {
        Self { path: None, max_connections: default_max_connections() }
    }
}

/// Settings for a PostgreSQL backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresSettings {
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}
impl std::fmt::Debug for PostgresSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSettings")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}
