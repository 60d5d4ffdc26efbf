use crate::error::{ErrorKind, Result, raise_connection};
use crate::options::ModelOptions;
use exn::{OptionExt, ResultExt};
use tabula_cache::{CacheEntry, CacheHandle, CacheKey};
use tabula_connection::{ConnectionHandle, FactoryHandle};
use tabula_query::{Count, Delete, Insert, LoadOptions, Record, Row, Select, Table, Update, Value};

/// Suffix appended to the table name to scope cached counts.
const COUNT_SCOPE_SUFFIX: &str = "_count";

/// A table in the backing store.
///
/// Every operation builds its SQL text, remembers it as
/// [`last_query`](Self::last_query), resolves a connection for the model's
/// backend through the factory and executes the statement. Loads and counts
/// can be answered from the cache instead.
///
/// Operations take `&mut self`, so a model has at most one operation in
/// flight. Share the factory and cache handles, not the model.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tabula_cache::MemoryCache;
/// use tabula_connection::Registry;
/// use tabula_connection::backend::MockBackend;
/// use tabula_model::{Model, ModelOptions};
/// use tabula_query::{LoadOptions, Record};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = Arc::new(MockBackend::default().with_name("default"));
/// let mut posts = Model::new(
///     "posts",
///     Arc::new(Registry::new(backend)),
///     Arc::new(MemoryCache::default()),
///     ModelOptions::default(),
/// )?;
///
/// posts.load(&Record::new().with("id", 1), &LoadOptions::default()).await?;
/// assert_eq!(posts.last_query(), "SELECT * FROM posts WHERE id = 1;");
/// # Ok(())
/// # }
/// ```
pub struct Model {
    table: Table,
    last_query: String,
    data: Vec<Row>,
    options: ModelOptions,
    connections: FactoryHandle,
    cache: CacheHandle,
}

impl Model {
    /// Create a model for `table`.
    ///
    /// # Errors
    /// [`ErrorKind::Query`] when `table` is not a plain SQL identifier.
    pub fn new(
        table: impl Into<String>,
        connections: FactoryHandle,
        cache: CacheHandle,
        options: ModelOptions,
    ) -> Result<Self> {
        let name = table.into();
        let table = Table::new(name.clone()).or_raise(|| ErrorKind::Query(name.clone()))?;
        Ok(Self { table, last_query: String::new(), data: Vec::new(), options, connections, cache })
    }

    pub fn table(&self) -> &str {
        self.table.name()
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    /// SQL text of the most recently built statement. Empty until the first
    /// statement is built; untouched by loads answered from the cache.
    pub fn last_query(&self) -> &str {
        &self.last_query
    }

    /// All rows of the last load.
    pub fn rows(&self) -> &[Row] {
        &self.data
    }

    /// First row of the last load, or an empty record when it matched nothing.
    pub fn data(&self) -> Row {
        self.data.first().cloned().unwrap_or_default()
    }

    /// Token suitable for salts and similar secrets.
    pub fn random_string(&self) -> String {
        tabula_query::random_string()
    }

    fn connection(&self) -> ConnectionHandle {
        self.connections.get(&self.options.backend)
    }

    fn count_scope(&self) -> String {
        format!("{}{COUNT_SCOPE_SUFFIX}", self.table)
    }

    fn invalid_request(&self) -> ErrorKind {
        ErrorKind::Query(self.table.name().to_string())
    }

    async fn cached(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let entry = self.cache.get(key).await.or_raise(|| ErrorKind::Cache)?;
        match &entry {
            Some(_) => tracing::debug!(cache = self.cache.name(), %key, "Cache hit"),
            None => tracing::debug!(cache = self.cache.name(), %key, "Cache miss"),
        }
        Ok(entry)
    }

    async fn select(&mut self, sql: String) -> Result<Vec<Row>> {
        let connection = self.connection();
        self.last_query = sql;
        raise_connection(connection.select(&self.last_query).await, connection.name())
    }

    async fn execute(&mut self, sql: String) -> Result<Vec<Row>> {
        let connection = self.connection();
        self.last_query = sql;
        let rows = raise_connection(connection.insert(&self.last_query).await, connection.name())?;
        // The statement has run; a stale cache must not hide its outcome.
        if self.options.invalidate_on_write
            && let Err(err) = self.invalidate().await
        {
            tracing::warn!(
                table = %self.table,
                cache = self.cache.name(),
                error = ?err,
                "Could not invalidate cached reads"
            );
        }
        Ok(rows)
    }

    /// Drop every cached load and count of this table.
    pub async fn invalidate(&self) -> Result<()> {
        let mut removed = self.cache.invalidate(self.table.name()).await.or_raise(|| ErrorKind::Cache)?;
        removed += self.cache.invalidate(&self.count_scope()).await.or_raise(|| ErrorKind::Cache)?;
        tracing::debug!(table = %self.table, removed, "Invalidated cached reads");
        Ok(())
    }

    /// Load the rows matching `filters` into the model.
    ///
    /// With caching enabled a stored result for the same filters and options
    /// is used as-is and no connection is resolved. Otherwise the select is
    /// executed and its result stored for later loads.
    pub async fn load(&mut self, filters: &Record, options: &LoadOptions) -> Result<&Self> {
        let key = self.cache.load_key(self.table.name(), filters, options);
        if self.options.enable_cache
            && let Some(rows) = self.cached(&key).await?.and_then(CacheEntry::into_rows)
        {
            self.data = rows;
            return Ok(self);
        }

        let sql = Select::new(&self.table, filters, options).or_raise(|| self.invalid_request())?.to_string();
        let rows = self.select(sql).await?;
        self.cache.set(key, CacheEntry::Rows(rows.clone())).await.or_raise(|| ErrorKind::Cache)?;
        self.data = rows;
        Ok(self)
    }

    /// Insert a row, returning the id the store assigned to it.
    ///
    /// # Errors
    /// [`ErrorKind::MissingReturnedId`] when the backend answered without an
    /// integer `id`.
    pub async fn create(&mut self, data: &Record) -> Result<i64> {
        let sql = Insert::new(&self.table, data).or_raise(|| self.invalid_request())?.to_string();
        let rows = self.execute(sql).await?;
        rows.first()
            .and_then(Row::id)
            .and_then(Value::as_i64)
            .ok_or_raise(|| ErrorKind::MissingReturnedId(self.table.name().to_string()))
    }

    /// Insert a row and read it back by its new id.
    ///
    /// Returns an empty record when the row cannot be read back.
    pub async fn create_and_load(&mut self, data: &Record) -> Result<Row> {
        let id = self.create(data).await?;
        let filters = Record::new().with("id", id);
        let sql = Select::new(&self.table, &filters, &LoadOptions::default().limit(1))
            .or_raise(|| self.invalid_request())?
            .to_string();
        let rows = self.select(sql).await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    /// Update the row identified by `data.id`, returning `data` unchanged.
    ///
    /// Requests without an integer `id` are rejected before any SQL is built.
    pub async fn update(&mut self, data: &Record) -> Result<Record> {
        let sql = Update::new(&self.table, data).or_raise(|| self.invalid_request())?.to_string();
        self.execute(sql).await?;
        Ok(data.clone())
    }

    /// Delete the row identified by `data.id`, returning that id.
    pub async fn remove(&mut self, data: &Record) -> Result<i64> {
        let delete = Delete::new(&self.table, data).or_raise(|| self.invalid_request())?;
        let id = delete.id();
        let sql = delete.to_string();
        self.execute(sql).await?;
        Ok(id)
    }

    /// Count the rows matching `filters`.
    ///
    /// A stored count is always used, whether or not loads are cached.
    /// Counts are cached separately from loads of the same filters.
    pub async fn count(&mut self, filters: &Record) -> Result<u64> {
        let key = self.cache.key(&self.count_scope(), filters);
        if let Some(count) = self.cached(&key).await?.as_ref().and_then(CacheEntry::as_count) {
            return Ok(count);
        }

        let sql = Count::new(&self.table, filters).or_raise(|| self.invalid_request())?.to_string();
        let rows = self.select(sql).await?;
        let count = match rows.first() {
            Some(row) => count_of(row).ok_or_raise(|| ErrorKind::InvalidCount(self.table.name().to_string()))?,
            None => 0,
        };
        self.cache.set(key, CacheEntry::Count(count)).await.or_raise(|| ErrorKind::Cache)?;
        Ok(count)
    }
}

/// Read a count from the `count` column, or from the first column when the
/// backend names it differently (SQLite reports `COUNT(*)`).
fn count_of(row: &Row) -> Option<u64> {
    let value = row.get("count").or_else(|| row.first().map(|(_, value)| value))?;
    match value {
        Value::Integer(count) => u64::try_from(*count).ok(),
        Value::String(count) => count.parse().ok(),
        _ => None,
    }
}
