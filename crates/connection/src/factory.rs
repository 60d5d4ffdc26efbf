//! Backend selection.

use crate::ConnectionHandle;
use std::collections::HashMap;

/// Resolves a backend identifier to a live connection.
///
/// Resolution never fails: identifiers that are not known resolve to the
/// factory's default backend, which keeps single-backend deployments free of
/// any identifier plumbing.
pub trait ConnectionFactory: Send + Sync {
    fn get(&self, backend: &str) -> ConnectionHandle;
}

/// Map of named connections with a mandatory default.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tabula_connection::{ConnectionFactory, Registry};
/// use tabula_connection::backend::MockBackend;
///
/// let main = Arc::new(MockBackend::default().with_name("main"));
/// let reports = Arc::new(MockBackend::default().with_name("reports"));
/// let registry = Registry::new(main).with(reports);
///
/// assert_eq!(registry.get("reports").name(), "reports");
/// // Unknown identifiers fall back to the default backend.
/// assert_eq!(registry.get("typo").name(), "main");
/// ```
#[derive(Clone)]
pub struct Registry {
    default: ConnectionHandle,
    connections: HashMap<String, ConnectionHandle>,
}
impl Registry {
    /// Create a registry whose default backend is `default`, registered
    /// under its own [`name`](crate::Connection::name).
    pub fn new(default: ConnectionHandle) -> Self {
        let mut connections = HashMap::new();
        connections.insert(default.name().to_string(), default.clone());
        Self { default, connections }
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, connection: ConnectionHandle) -> Self {
        self.register(connection);
        self
    }

    /// Register a connection under its name, returning the connection it
    /// replaced. Replacing the default's name also replaces the default.
    pub fn register(&mut self, connection: ConnectionHandle) -> Option<ConnectionHandle> {
        let name = connection.name().to_string();
        if name == self.default.name() {
            self.default = connection.clone();
        }
        self.connections.insert(name, connection)
    }

    /// Name of the default backend.
    pub fn default_name(&self) -> &str {
        self.default.name()
    }

    pub fn contains(&self, backend: &str) -> bool {
        self.connections.contains_key(backend)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }
}

impl ConnectionFactory for Registry {
    fn get(&self, backend: &str) -> ConnectionHandle {
        match self.connections.get(backend) {
            Some(connection) => connection.clone(),
            None => {
                tracing::warn!(requested = backend, default = self.default.name(), "Unknown backend; using default");
                self.default.clone()
            },
        }
    }
}
