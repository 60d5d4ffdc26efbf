//! Per-model options.

use serde::{Deserialize, Serialize};

/// Backend identifier used when a model does not name one.
pub const DEFAULT_BACKEND: &str = "default";

/// Per-model behaviour, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    /// Answer loads and counts from the cache when an entry exists.
    pub enable_cache: bool,
    /// Drop the table's cached loads and counts after a successful write.
    pub invalidate_on_write: bool,
    /// Identifier passed to the connection factory for every statement.
    pub backend: String,
}
impl ModelOptions {
    pub fn cached(mut self, enable_cache: bool) -> Self {
        self.enable_cache = enable_cache;
        self
    }

    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    pub fn invalidate_on_write(mut self, invalidate: bool) -> Self {
        self.invalidate_on_write = invalidate;
        self
    }
}
impl Default for ModelOptions {
    fn default() -> Self {
        Self { enable_cache: false, invalidate_on_write: true, backend: DEFAULT_BACKEND.to_string() }
    }
}
