use async_trait::async_trait;
use rstest::{fixture, rstest};
use std::sync::Arc;
use tabula_cache::{CacheEntry, CacheKey, CacheStrategy, MemoryCache};
use tabula_connection::backend::{MockBackend, Operation, ReadOnlyBackend};
use tabula_connection::{ConnectionHandle, Registry};
use tabula_model::error::ErrorKind;
use tabula_model::{LoadOptions, Model, ModelOptions, OrderBy, Record, Row};

struct Harness {
    backend: Arc<MockBackend>,
    cache: Arc<MemoryCache>,
    registry: Arc<Registry>,
}
impl Harness {
    fn model(&self, options: ModelOptions) -> Model {
        Model::new("users", self.registry.clone(), self.cache.clone(), options).unwrap()
    }
}

#[fixture]
fn harness() -> Harness {
    let backend = Arc::new(MockBackend::default().with_name("default"));
    let registry = Arc::new(Registry::new(backend.clone()));
    Harness { backend, cache: Arc::new(MemoryCache::default()), registry }
}

fn tom() -> Row {
    Row::new().with("id", 1).with("login", "tom")
}

/// Cache that serves reads but cannot drop entries.
#[derive(Default)]
struct StickyCache {
    inner: MemoryCache,
}

#[async_trait]
impl CacheStrategy for StickyCache {
    fn name(&self) -> &str {
        "sticky"
    }

    async fn get(&self, key: &CacheKey) -> tabula_cache::error::Result<Option<CacheEntry>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: CacheKey, entry: CacheEntry) -> tabula_cache::error::Result<()> {
        self.inner.set(key, entry).await
    }

    async fn invalidate(&self, _scope: &str) -> tabula_cache::error::Result<u64> {
        exn::bail!(tabula_cache::error::ErrorKind::Database)
    }
}

#[rstest]
#[tokio::test]
async fn test_cached_load_skips_connection(harness: Harness) {
    harness.backend.push_select(vec![tom()]).await;
    let mut users = harness.model(ModelOptions::default().cached(true));
    let filters = Record::new().with("login", "tom");

    users.load(&filters, &LoadOptions::default()).await.unwrap();
    assert_eq!(users.data(), tom());
    users.load(&filters, &LoadOptions::default()).await.unwrap();
    assert_eq!(users.rows(), [tom()]);

    // A second model sharing the cache is answered without a query as well.
    let mut other = harness.model(ModelOptions::default().cached(true));
    other.load(&Record::new().with("login", "tom"), &LoadOptions::default()).await.unwrap();
    assert_eq!(other.data(), tom());
    assert!(other.last_query().is_empty());

    assert_eq!(harness.backend.calls(Operation::Select).await, 1);
}

#[rstest]
#[tokio::test]
async fn test_cached_pages_kept_apart(harness: Harness) {
    let (first, second) = (Row::new().with("id", 1), Row::new().with("id", 3));
    harness.backend.push_select(vec![first.clone()]).await;
    harness.backend.push_select(vec![second.clone()]).await;
    let mut users = harness.model(ModelOptions::default().cached(true));

    users.load(&Record::new(), &LoadOptions::default().limit(1)).await.unwrap();
    assert_eq!(users.data(), first);
    users.load(&Record::new(), &LoadOptions::default().limit(1).offset(1)).await.unwrap();
    assert_eq!(users.data(), second);
    assert_eq!(users.last_query(), "SELECT * FROM users WHERE TRUE LIMIT 1 OFFSET 1;");

    // Each page is now answered from its own entry.
    users.load(&Record::new(), &LoadOptions::default().limit(1)).await.unwrap();
    assert_eq!(users.data(), first);
    assert_eq!(harness.backend.calls(Operation::Select).await, 2);
}

#[rstest]
#[tokio::test]
async fn test_uncached_load_always_queries(harness: Harness) {
    let mut users = harness.model(ModelOptions::default());
    users.load(&Record::new(), &LoadOptions::default()).await.unwrap();
    users.load(&Record::new(), &LoadOptions::default()).await.unwrap();
    assert_eq!(harness.backend.calls(Operation::Select).await, 2);
    // Loads still populate the cache for models that do read from it.
    assert_eq!(harness.cache.len().await, 1);
}

#[rstest]
#[tokio::test]
async fn test_load_statement(harness: Harness) {
    let mut users = harness.model(ModelOptions::default());
    let options = LoadOptions::default().order_by(OrderBy::desc("id")).limit(10).offset(20);
    let filters = Record::new().with("login", "o'brien").with("permissions", 3);
    users.load(&filters, &options).await.unwrap();
    assert_eq!(
        users.last_query(),
        "SELECT * FROM users WHERE login = 'o''brien' AND permissions = 3 ORDER BY id DESC LIMIT 10 OFFSET 20;"
    );
    assert_eq!(harness.backend.last_statement().await.as_deref(), Some(users.last_query()));
    assert_eq!(users.data(), Row::new());
}

#[rstest]
#[tokio::test]
async fn test_create(harness: Harness) {
    harness.backend.push_insert(vec![Row::new().with("id", 42)]).await;
    let mut users = harness.model(ModelOptions::default());
    let id = users.create(&Record::new().with("login", "a").with("password", "b")).await.unwrap();
    assert_eq!(id, 42);
    assert_eq!(users.last_query(), "INSERT INTO users(login,password) VALUES('a','b') RETURNING id;");
    assert_eq!(harness.backend.calls(Operation::Insert).await, 1);
}

#[rstest]
#[tokio::test]
async fn test_create_without_returned_id(harness: Harness) {
    let mut users = harness.model(ModelOptions::default());
    let err = users.create(&Record::new().with("login", "a")).await.unwrap_err();
    assert_eq!(*err, ErrorKind::MissingReturnedId("users".to_string()));
}

#[rstest]
#[tokio::test]
async fn test_create_and_load(harness: Harness) {
    harness.backend.push_insert(vec![Row::new().with("id", 7)]).await;
    harness.backend.push_select(vec![Row::new().with("id", 7).with("login", "ann")]).await;
    let mut users = harness.model(ModelOptions::default());
    let row = users.create_and_load(&Record::new().with("login", "ann")).await.unwrap();
    assert_eq!(row, Row::new().with("id", 7).with("login", "ann"));
    assert_eq!(users.last_query(), "SELECT * FROM users WHERE id = 7 LIMIT 1;");
}

#[rstest]
#[tokio::test]
async fn test_create_and_load_missing_row(harness: Harness) {
    harness.backend.push_insert(vec![Row::new().with("id", 7)]).await;
    let mut users = harness.model(ModelOptions::default());
    let row = users.create_and_load(&Record::new().with("login", "ann")).await.unwrap();
    assert!(row.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_update_echoes_input(harness: Harness) {
    let mut users = harness.model(ModelOptions::default());
    let data = Record::new().with("id", 5).with("login", "x");
    assert_eq!(users.update(&data).await.unwrap(), data);
    assert_eq!(users.last_query(), "UPDATE users SET login = 'x' WHERE id = 5;");
    assert_eq!(harness.backend.calls(Operation::Insert).await, 1);
}

#[rstest]
#[case::missing_id(Record::new().with("login", "x"))]
#[case::textual_id(Record::new().with("id", "5").with("login", "x"))]
#[case::nothing_to_set(Record::new().with("id", 5))]
#[case::bad_field(Record::new().with("id", 5).with("login; DROP TABLE users", "x"))]
#[tokio::test]
async fn test_update_rejected_before_sql(harness: Harness, #[case] data: Record) {
    let mut users = harness.model(ModelOptions::default());
    let err = users.update(&data).await.unwrap_err();
    assert_eq!(*err, ErrorKind::Query("users".to_string()));
    assert!(users.last_query().is_empty());
    assert!(harness.backend.executed().await.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_remove(harness: Harness) {
    let mut users = harness.model(ModelOptions::default());
    assert_eq!(users.remove(&Record::new().with("id", 7)).await.unwrap(), 7);
    assert_eq!(users.last_query(), "DELETE FROM users WHERE id = 7;");
    assert_eq!(harness.backend.calls(Operation::Insert).await, 1);

    let err = users.remove(&Record::new()).await.unwrap_err();
    assert_eq!(*err, ErrorKind::Query("users".to_string()));
}

#[rstest]
#[tokio::test]
async fn test_count(harness: Harness) {
    harness.backend.push_select(vec![Row::new().with("count", 3)]).await;
    let mut users = harness.model(ModelOptions::default().cached(true));
    let filters = Record::new().with("permissions", 1);
    assert_eq!(users.count(&filters).await.unwrap(), 3);
    assert_eq!(users.last_query(), "SELECT COUNT(*) FROM users WHERE permissions = 1;");
    assert_eq!(users.count(&filters).await.unwrap(), 3);
    assert_eq!(harness.backend.calls(Operation::Select).await, 1);
}

#[rstest]
#[case::cached(true)]
#[case::uncached(false)]
#[tokio::test]
async fn test_stored_count_always_used(harness: Harness, #[case] enable_cache: bool) {
    let key = harness.cache.key("users_count", &Record::new());
    harness.cache.set(key, CacheEntry::Count(9)).await.unwrap();
    let mut users = harness.model(ModelOptions::default().cached(enable_cache));
    assert_eq!(users.count(&Record::new()).await.unwrap(), 9);
    assert!(users.last_query().is_empty());
    assert_eq!(harness.backend.calls(Operation::Select).await, 0);
}

#[rstest]
#[tokio::test]
async fn test_count_without_rows(harness: Harness) {
    let mut users = harness.model(ModelOptions::default());
    assert_eq!(users.count(&Record::new()).await.unwrap(), 0);
    assert_eq!(users.last_query(), "SELECT COUNT(*) FROM users WHERE TRUE;");
}

#[rstest]
#[tokio::test]
async fn test_counts_and_loads_cached_apart(harness: Harness) {
    harness.backend.push_select(vec![tom()]).await;
    harness.backend.push_select(vec![Row::new().with("count", 1)]).await;
    let mut users = harness.model(ModelOptions::default().cached(true));
    users.load(&Record::new(), &LoadOptions::default()).await.unwrap();
    assert_eq!(users.count(&Record::new()).await.unwrap(), 1);
    assert_eq!(harness.backend.calls(Operation::Select).await, 2);
    assert_eq!(harness.cache.len().await, 2);
}

#[rstest]
#[case::invalidating(true, 2)]
#[case::keeping(false, 1)]
#[tokio::test]
async fn test_writes_invalidate_cached_reads(harness: Harness, #[case] invalidate: bool, #[case] selects: usize) {
    harness.backend.push_insert(vec![Row::new().with("id", 2)]).await;
    let options = ModelOptions::default().cached(true).invalidate_on_write(invalidate);
    let mut users = harness.model(options);

    users.load(&Record::new(), &LoadOptions::default()).await.unwrap();
    users.count(&Record::new()).await.unwrap();
    users.create(&Record::new().with("login", "bob")).await.unwrap();
    users.load(&Record::new(), &LoadOptions::default()).await.unwrap();

    assert_eq!(harness.backend.calls(Operation::Select).await, selects + 1);
    let count_key = harness.cache.key("users_count", &Record::new());
    assert_eq!(harness.cache.get(&count_key).await.unwrap().is_some(), !invalidate);
}

#[rstest]
#[tokio::test]
async fn test_connection_failure_propagates(harness: Harness) {
    harness.backend.push_select(vec![tom()]).await;
    let mut users = harness.model(ModelOptions::default());
    users.load(&Record::new(), &LoadOptions::default()).await.unwrap();

    harness.backend.push_failure(Operation::Select).await;
    let err = users.load(&Record::new(), &LoadOptions::default()).await.err().unwrap();
    assert_eq!(*err, ErrorKind::Connection { backend: "default".to_string(), retryable: true });
    assert!(err.is_retryable());
    // The previous result is left in place.
    assert_eq!(users.data(), tom());
}

#[rstest]
#[tokio::test]
async fn test_failed_write_keeps_cache(harness: Harness) {
    harness.backend.push_failure(Operation::Insert).await;
    let mut users = harness.model(ModelOptions::default().cached(true));
    users.load(&Record::new(), &LoadOptions::default()).await.unwrap();
    assert!(users.create(&Record::new().with("login", "bob")).await.is_err());
    assert_eq!(harness.cache.len().await, 1);
}

#[rstest]
#[tokio::test]
async fn test_write_outcome_survives_invalidation_failure(harness: Harness) {
    harness.backend.push_insert(vec![Row::new().with("id", 42)]).await;
    let cache = Arc::new(StickyCache::default());
    let mut users = Model::new("users", harness.registry.clone(), cache, ModelOptions::default()).unwrap();

    assert_eq!(users.create(&Record::new().with("login", "bob")).await.unwrap(), 42);
    assert_eq!(users.remove(&Record::new().with("id", 42)).await.unwrap(), 42);
    assert_eq!(harness.backend.calls(Operation::Insert).await, 2);
    assert!(users.invalidate().await.is_err());
}

#[tokio::test]
async fn test_backend_selection() {
    let main = Arc::new(MockBackend::default().with_name("main"));
    let reports = Arc::new(MockBackend::default().with_name("reports"));
    let registry = Arc::new(Registry::new(main.clone()).with(reports.clone()));
    let cache = Arc::new(MemoryCache::default());

    let options = ModelOptions::default().backend("reports");
    let mut selected = Model::new("users", registry.clone(), cache.clone(), options).unwrap();
    selected.load(&Record::new(), &LoadOptions::default()).await.unwrap();
    let mut unknown = Model::new("users", registry, cache, ModelOptions::default().backend("typo")).unwrap();
    unknown.load(&Record::new(), &LoadOptions::default()).await.unwrap();

    assert_eq!(reports.calls(Operation::Select).await, 1);
    assert_eq!(main.calls(Operation::Select).await, 1);
}

#[tokio::test]
async fn test_read_only_backend_refuses_writes() {
    let inner = Arc::new(MockBackend::default().with_name("default"));
    let read_only: ConnectionHandle = Arc::new(ReadOnlyBackend::new(inner.clone()));
    let registry = Arc::new(Registry::new(read_only));
    let cache = Arc::new(MemoryCache::default());
    let mut users = Model::new("users", registry, cache.clone(), ModelOptions::default()).unwrap();
    users.load(&Record::new(), &LoadOptions::default()).await.unwrap();

    let refused = ErrorKind::Connection { backend: "default".to_string(), retryable: false };
    let err = users.create(&Record::new().with("login", "a")).await.unwrap_err();
    assert_eq!(*err, refused);
    let err = users.update(&Record::new().with("id", 5).with("login", "x")).await.unwrap_err();
    assert_eq!(*err, refused);
    let err = users.remove(&Record::new().with("id", 5)).await.unwrap_err();
    assert_eq!(*err, refused);

    assert_eq!(inner.calls(Operation::Insert).await, 0);
    // Nothing was written, so nothing was invalidated.
    assert_eq!(cache.len().await, 1);
}

#[rstest]
#[case::empty("")]
#[case::injection("users; DROP TABLE users")]
#[case::quoted("\"users\"")]
fn test_invalid_table(harness: Harness, #[case] table: &str) {
    let options = ModelOptions::default();
    let err = Model::new(table, harness.registry.clone(), harness.cache.clone(), options).err().unwrap();
    assert_eq!(*err, ErrorKind::Query(table.to_string()));
}

#[rstest]
fn test_random_string(harness: Harness) {
    let users = harness.model(ModelOptions::default());
    let token = users.random_string();
    assert_eq!(token.len(), tabula_query::TOKEN_LENGTH);
    assert_ne!(token, users.random_string());
}
