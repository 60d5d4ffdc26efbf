//! Configuration for tabula.
//!
//! Sources are merged in order, later sources overriding earlier ones:
//!
//! 1. built-in defaults (one in-memory SQLite backend named `default`),
//! 2. `config.toml`, `config.yaml` or `config.json` in the user's config
//!    directory,
//! 3. an explicitly given file (format chosen by extension),
//! 4. `TABULA_` environment variables, with `__` separating nested keys
//!    (`TABULA_MODEL__ENABLE_CACHE=true`).
//!
//! ```toml
//! default_backend = "main"
//!
//! [model]
//! enable_cache = true
//!
//! [cache]
//! kind = "sqlite"
//! path = "/var/cache/tabula.sqlite"
//!
//! [backends.main]
//! kind = "postgres"
//! hostname = "localhost"
//! user = "app"
//! password = "secret"
//! database = "app"
//! ```

mod backends;
pub mod error;

pub use crate::backends::{BackendConfig, CacheConfig};
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tabula_cache::CacheHandle;
use tabula_connection::Registry;
use tabula_model::{DEFAULT_BACKEND, ModelOptions};

const ENV_PREFIX: &str = "TABULA_";

/// Defaults applied to every model built from this configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelDefaults {
    pub enable_cache: bool,
    pub invalidate_on_write: bool,
}
impl Default for ModelDefaults {
    fn default() -> Self {
        let options = ModelOptions::default();
        Self { enable_cache: options.enable_cache, invalidate_on_write: options.invalidate_on_write }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend used by models that do not name one, and the fallback for
    /// unknown backend identifiers.
    pub default_backend: String,
    pub model: ModelDefaults,
    pub cache: CacheConfig,
    pub backends: BTreeMap<String, BackendConfig>,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            default_backend: DEFAULT_BACKEND.to_string(),
            model: ModelDefaults::default(),
            cache: CacheConfig::default(),
            backends: BTreeMap::from([(DEFAULT_BACKEND.to_string(), BackendConfig::default())]),
        }
    }
}

impl Config {
    /// Load and validate the configuration from every source.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let user_dir = ProjectDirs::from("", "", "tabula").map(|dirs| dirs.config_dir().to_path_buf());
        Self::extract(Self::figment(user_dir.as_deref(), explicit)?)
    }

    /// Load and validate a single file, ignoring the user config directory
    /// and the environment.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::extract(Figment::new().merge(file_provider(path)?))
    }

    fn figment(user_dir: Option<&Path>, explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new();
        if let Some(dir) = user_dir {
            figment = figment
                .merge(Toml::file(dir.join("config.toml")))
                .merge(Yaml::file(dir.join("config.yaml")))
                .merge(Json::file(dir.join("config.json")));
        }
        if let Some(path) = explicit {
            figment = figment.merge(file_provider(path)?);
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let sources: Vec<String> = figment.metadata().map(|metadata| metadata.name.to_string()).collect();
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load(sources.join(", ")))?;
        config.validate()?;
        tracing::debug!(
            default_backend = %config.default_backend,
            backends = config.backends.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Check the cross-field rules serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if !self.backends.contains_key(&self.default_backend) {
            exn::bail!(ErrorKind::Invalid(format!("default backend {:?} is not configured", self.default_backend)));
        }
        if let Some((name, _)) = self.backends.iter().find(|(_, backend)| backend.max_connections() == 0) {
            exn::bail!(ErrorKind::Invalid(format!("backend {name:?} allows no connections")));
        }
        Ok(())
    }

    /// Connect every configured backend.
    ///
    /// Unknown identifiers given to the registry resolve to
    /// [`default_backend`](Self::default_backend).
    pub async fn registry(&self) -> Result<Registry> {
        self.validate()?;
        let mut others = Vec::with_capacity(self.backends.len());
        let mut default = None;
        for (name, backend) in &self.backends {
            let connection = backend.connect(name).await?;
            match name == &self.default_backend {
                true => default = Some(connection),
                false => others.push(connection),
            }
        }
        let default = default.ok_or_raise(|| ErrorKind::Invalid("no default backend".to_string()))?;
        Ok(others.into_iter().fold(Registry::new(default), Registry::with))
    }

    pub async fn cache(&self) -> Result<CacheHandle> {
        self.cache.open().await
    }

    /// Options for a model on the default backend.
    pub fn model_options(&self) -> ModelOptions {
        ModelOptions {
            enable_cache: self.model.enable_cache,
            invalidate_on_write: self.model.invalidate_on_write,
            backend: self.default_backend.clone(),
        }
    }
}

/// File provider matching the extension of `path`.
///
/// Unlike the user config directory, an explicit file must exist.
fn file_provider(path: &Path) -> Result<Figment> {
    let load_err = || ErrorKind::Load(path.display().to_string());
    if !path.is_file() {
        exn::bail!(load_err());
    }
    let figment = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Figment::from(Toml::file(path)),
        Some("yaml" | "yml") => Figment::from(Yaml::file(path)),
        Some("json") => Figment::from(Json::file(path)),
        _ => exn::bail!(ErrorKind::Invalid(format!("unsupported configuration format: {}", path.display()))),
    };
    Ok(figment)
}
