//! In-memory connection backend for testing.

use crate::Connection;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use tabula_query::Row;
use tokio::sync::Mutex;

/// Which [`Connection`] method a statement was sent through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
}

enum Response {
    Rows(Vec<Row>),
    Fail,
}

/// Scripted connection backend for testing.
///
/// Every executed statement is recorded. Responses are queued per
/// [`Operation`] and consumed in order; once a queue is empty the backend
/// answers with an empty row set. Ideal for asserting on generated SQL and
/// on whether the database was touched at all.
///
/// # Examples
///
/// ```
/// use tabula_connection::backend::{MockBackend, Operation};
/// use tabula_connection::Connection;
/// use tabula_query::Row;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::default();
/// backend.push_insert(vec![Row::new().with("id", 12)]).await;
///
/// let rows = backend.insert("INSERT INTO users(login) VALUES('tom') RETURNING id;").await?;
/// assert_eq!(rows[0].id().and_then(|id| id.as_i64()), Some(12));
/// assert_eq!(backend.calls(Operation::Insert).await, 1);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    selects: Mutex<VecDeque<Response>>,
    inserts: Mutex<VecDeque<Response>>,
    executed: Mutex<Vec<(Operation, String)>>,
}

impl MockBackend {
    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Queue the rows returned by the next unanswered `select`.
    pub async fn push_select(&self, rows: Vec<Row>) {
        self.selects.lock().await.push_back(Response::Rows(rows));
    }

    /// Queue the rows returned by the next unanswered `insert`.
    pub async fn push_insert(&self, rows: Vec<Row>) {
        self.inserts.lock().await.push_back(Response::Rows(rows));
    }

    /// Make the next unanswered call of `operation` fail with a connection error.
    pub async fn push_failure(&self, operation: Operation) {
        self.queue(operation).lock().await.push_back(Response::Fail);
    }

    /// All statements executed so far, in order.
    pub async fn executed(&self) -> Vec<(Operation, String)> {
        self.executed.lock().await.clone()
    }

    /// The most recently executed statement.
    pub async fn last_statement(&self) -> Option<String> {
        self.executed.lock().await.last().map(|(_, sql)| sql.clone())
    }

    /// Number of statements executed through `operation`.
    pub async fn calls(&self, operation: Operation) -> usize {
        self.executed.lock().await.iter().filter(|(op, _)| *op == operation).count()
    }

    fn queue(&self, operation: Operation) -> &Mutex<VecDeque<Response>> {
        match operation {
            Operation::Select => &self.selects,
            Operation::Insert => &self.inserts,
        }
    }

    async fn respond(&self, operation: Operation, sql: &str) -> Result<Vec<Row>> {
        self.executed.lock().await.push((operation, sql.to_string()));
        match self.queue(operation).lock().await.pop_front() {
            Some(Response::Rows(rows)) => Ok(rows),
            Some(Response::Fail) => exn::bail!(ErrorKind::Connection(self.name.clone())),
            None => Ok(Vec::new()),
        }
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            selects: Mutex::new(VecDeque::new()),
            inserts: Mutex::new(VecDeque::new()),
            executed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Connection for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn select(&self, sql: &str) -> Result<Vec<Row>> {
        self.respond(Operation::Select, sql).await
    }

    async fn insert(&self, sql: &str) -> Result<Vec<Row>> {
        self.respond(Operation::Insert, sql).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_responses_in_order() {
        let backend = MockBackend::default();
        backend.push_select(vec![Row::new().with("id", 1)]).await;
        backend.push_select(vec![]).await;
        assert_eq!(backend.select("a").await.unwrap().len(), 1);
        assert!(backend.select("b").await.unwrap().is_empty());
        // Exhausted queue answers with no rows.
        assert!(backend.select("c").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queues_are_independent() {
        let backend = MockBackend::default();
        backend.push_insert(vec![Row::new().with("id", 9)]).await;
        assert!(backend.select("SELECT 1;").await.unwrap().is_empty());
        assert_eq!(backend.insert("INSERT;").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure() {
        let backend = MockBackend::default().with_name("flaky");
        backend.push_failure(Operation::Insert).await;
        let err = backend.insert("INSERT;").await.unwrap_err();
        assert_eq!(*err, ErrorKind::Connection("flaky".to_string()));
        assert!(backend.insert("INSERT;").await.is_ok());
    }

    #[tokio::test]
    async fn test_records_statements() {
        let backend = MockBackend::default();
        backend.select("SELECT 1;").await.unwrap();
        backend.insert("DELETE FROM users WHERE id = 1;").await.unwrap();
        assert_eq!(
            backend.executed().await,
            vec![
                (Operation::Select, "SELECT 1;".to_string()),
                (Operation::Insert, "DELETE FROM users WHERE id = 1;".to_string())
            ]
        );
        assert_eq!(backend.last_statement().await.as_deref(), Some("DELETE FROM users WHERE id = 1;"));
        assert_eq!(backend.calls(Operation::Select).await, 1);
    }
}
