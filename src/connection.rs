//! Connection manager: one database session with a scoped lifecycle.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, error, info, warn};

use crate::backend::{Backend, Session};
use crate::config::DbConfig;
use crate::error::{Error, Result};
use crate::sql::Statement;
use crate::types::{ColumnInfo, Record};

/// Result of a query execution.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Column names shared by all rows.
    pub columns: Arc<ColumnInfo>,
    /// Rows returned.
    pub rows: Vec<Record>,
}

impl QueryResult {
    pub fn new(columns: Arc<ColumnInfo>, rows: Vec<Record>) -> Self {
        Self { columns, rows }
    }

    /// Get the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.column_names()
    }

    /// Iterate over rows.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.rows.iter()
    }

    /// First row, if any.
    pub fn into_first(self) -> Option<Record> {
        self.rows.into_iter().next()
    }
}

impl IntoIterator for QueryResult {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Owns the lifecycle of one database connection.
///
/// Construction stores the credentials only; [`acquire`](Self::acquire)
/// opens the session and [`release`](Self::release) closes it. Prefer
/// [`scope`](Self::scope), which releases on every path.
///
/// # Example
///
/// ```no_run
/// use rapport_patient::{ConnectionManager, DbConfig, MemoryBackend, MemoryStore, PatientDataFetcher};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DbConfig::new("rapport_ro", "password", "localhost:1521/RAPPORT")?;
///     let backend = MemoryBackend::new(MemoryStore::with_patient_tables());
///     let mut db = ConnectionManager::new(backend, config);
///
///     let basic = db
///         .scope(|db| {
///             Box::pin(async move {
///                 PatientDataFetcher::new(db)
///                     .get_patient_basic_info("0000000001")
///                     .await
///             })
///         })
///         .await?;
///     println!("{:?}", basic);
///     Ok(())
/// }
/// ```
pub struct ConnectionManager<B: Backend> {
    backend: B,
    config: DbConfig,
    session: Option<B::Session>,
}

impl<B: Backend> ConnectionManager<B> {
    /// Store the backend and credentials. Does not connect.
    pub fn new(backend: B, config: DbConfig) -> Self {
        Self {
            backend,
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether a session is currently open.
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Open the connection. A no-op if already open.
    pub async fn acquire(&mut self) -> Result<()> {
        if self.session.is_some() {
            debug!("connection already open");
            return Ok(());
        }

        let params = self.config.connect_params();
        match self.backend.open(&self.config).await {
            Ok(session) => {
                info!(
                    host = %params.host,
                    port = params.port,
                    service = %params.service_name,
                    user = self.config.username(),
                    "database connection established"
                );
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                error!(host = %params.host, service = %params.service_name, error = %e, "database connection failed");
                Err(e)
            }
        }
    }

    /// Close the connection. A no-op if already closed.
    pub async fn release(&mut self) -> Result<()> {
        match self.session.take() {
            Some(session) => {
                session.close().await?;
                info!("database connection closed");
                Ok(())
            }
            None => {
                debug!("connection already closed");
                Ok(())
            }
        }
    }

    /// Run `f` with an open connection and release it afterwards.
    ///
    /// The connection is released whether `f` succeeds or fails. If both `f`
    /// and the release fail, the error from `f` is returned and the release
    /// failure is logged.
    pub async fn scope<T, F>(&mut self, f: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut Self) -> BoxFuture<'c, Result<T>>,
    {
        self.acquire().await?;
        let outcome = f(&mut *self).await;
        let released = self.release().await;

        match (outcome, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(release_err)) => Err(release_err),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_err)) => {
                warn!(error = %release_err, "release failed after an earlier error");
                Err(e)
            }
        }
    }

    fn session_mut(&mut self) -> Result<&mut B::Session> {
        self.session.as_mut().ok_or(Error::ConnectionClosed)
    }

    /// Execute a read statement.
    pub async fn execute(&mut self, statement: &Statement) -> Result<QueryResult> {
        let bind_names: Vec<&str> = statement.binds().iter().map(|b| b.name).collect();
        debug!(table = statement.table_name(), binds = ?bind_names, sql = statement.sql(), "executing statement");

        let session = self.session_mut()?;
        match session.query(statement).await {
            Ok(result) => {
                debug!(table = statement.table_name(), rows = result.len(), "statement complete");
                Ok(result)
            }
            Err(e) => {
                error!(table = statement.table_name(), error = %e, "statement failed");
                Err(e)
            }
        }
    }

    /// Start a read-only transaction on the open connection.
    pub async fn begin_read_only(&mut self) -> Result<()> {
        debug!("beginning read-only transaction");
        self.session_mut()?.begin_read_only().await
    }

    /// End the read-only transaction.
    pub async fn end_read_only(&mut self) -> Result<()> {
        debug!("ending read-only transaction");
        self.session_mut()?.end_read_only().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, MemoryStore};
    use crate::schema::{BASIC_INFO_COLUMNS, PATIENT_BASIC};
    use crate::sql::Select;
    use tokio_test::{assert_err, assert_ok};

    fn manager() -> (ConnectionManager<MemoryBackend>, MemoryBackend) {
        let backend = MemoryBackend::new(MemoryStore::with_patient_tables());
        let config = DbConfig::new("rapport_ro", "pw", "localhost:1521/RAPPORT").unwrap();
        (ConnectionManager::new(backend.clone(), config), backend)
    }

    #[tokio::test]
    async fn test_new_does_not_connect() {
        let (db, backend) = manager();
        assert!(!db.is_open());
        assert_eq!(backend.probe().opens(), 0);
    }

    #[tokio::test]
    async fn test_acquire_and_release_idempotent() {
        let (mut db, backend) = manager();
        let probe = backend.probe();

        assert_ok!(db.acquire().await);
        assert_ok!(db.acquire().await);
        assert!(db.is_open());
        assert_eq!(probe.opens(), 1);

        assert_ok!(db.release().await);
        assert_ok!(db.release().await);
        assert!(!db.is_open());
        assert_eq!(probe.closes(), 1);
    }

    #[tokio::test]
    async fn test_execute_without_acquire() {
        let (mut db, backend) = manager();
        let stmt = Select::new(&PATIENT_BASIC, BASIC_INFO_COLUMNS).build();

        let err = assert_err!(db.execute(&stmt).await);
        assert!(matches!(err, Error::ConnectionClosed));
        assert_eq!(backend.probe().queries(), 0);
    }

    #[tokio::test]
    async fn test_query_result_columns() {
        let (mut db, _backend) = manager();
        let stmt = Select::new(&PATIENT_BASIC, BASIC_INFO_COLUMNS).build();

        assert_ok!(db.acquire().await);
        let result = assert_ok!(db.execute(&stmt).await);
        assert!(result.is_empty());
        assert_eq!(result.column_names()[0], "PATIENT_ID");
        assert_ok!(db.release().await);
    }
}
