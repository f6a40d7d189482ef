//! In-memory backend.
//!
//! Holds seeded tables keyed by source column and evaluates the same
//! [`Statement`]s the Oracle backend sends, binds included. A shared
//! [`MemoryProbe`] records every open, close and statement so callers can
//! check how the connection was used, and faults can be injected to
//! exercise the error paths.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::{Backend, Session};
use crate::config::DbConfig;
use crate::connection::QueryResult;
use crate::error::{Error, Result};
use crate::schema::{Table, ALL_TABLES};
use crate::sql::{BindValue, Predicate, SortOrder, Statement, LIKE_ESCAPE};
use crate::types::{Record, Value};

const ORA_TABLE_NOT_FOUND: &str = "ORA-00942: table or view does not exist";
const ORA_NOT_ALL_BOUND: &str = "ORA-01008: not all variables bound";
const ORA_INVALID_LOGON: &str = "ORA-01017: invalid username/password; logon denied";
const ORA_END_OF_FILE: &str = "ORA-03113: end-of-file on communication channel";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One stored row: source column name to value.
pub type SourceRow = HashMap<String, Value>;

/// Seeded tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: HashMap<String, Vec<SourceRow>>,
}

impl MemoryStore {
    /// Create a store with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with every patient table present and empty.
    pub fn with_patient_tables() -> Self {
        let mut store = Self::new();
        for table in ALL_TABLES {
            store.create_table(table);
        }
        store
    }

    /// Register an empty table. Existing rows are kept.
    pub fn create_table(&mut self, table: &Table) {
        self.tables.entry(table.name.to_string()).or_default();
    }

    /// Insert a row, creating the table if needed.
    pub fn insert<I, K, V>(&mut self, table: &Table, row: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let row = row
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.tables
            .entry(table.name.to_string())
            .or_default()
            .push(row);
    }

    /// Run a statement against the stored rows.
    pub fn evaluate(&self, statement: &Statement) -> Result<QueryResult> {
        let select = statement.select();
        let fail = |message: &str| Error::query(statement.table_name(), statement.sql(), message);

        let rows = self
            .tables
            .get(statement.table_name())
            .ok_or_else(|| fail(ORA_TABLE_NOT_FOUND))?;

        let mut matched = Vec::new();
        for row in rows {
            let mut keep = true;
            for predicate in select.predicates() {
                let bind = statement
                    .bind(predicate.bind())
                    .ok_or_else(|| fail(ORA_NOT_ALL_BOUND))?;
                if !matches_predicate(row, predicate, bind) {
                    keep = false;
                    break;
                }
            }
            if keep {
                matched.push(row);
            }
        }

        if let Some((column, order)) = select.ordering() {
            matched.sort_by(|a, b| {
                let ord = compare_values(a.get(column), b.get(column));
                match order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }

        if let Some(bind) = select.limit_bind() {
            match statement.bind(bind) {
                Some(BindValue::Integer(n)) => {
                    matched.truncate(usize::try_from(*n).unwrap_or(0));
                }
                _ => return Err(fail(ORA_NOT_ALL_BOUND)),
            }
        }

        let columns = Arc::new(statement.column_info());
        let records = matched
            .into_iter()
            .map(|row| {
                let values = select
                    .columns()
                    .iter()
                    .map(|c| row.get(c.source).cloned().unwrap_or(Value::Null))
                    .collect();
                Record::new(values, Arc::clone(&columns))
            })
            .collect();

        Ok(QueryResult::new(columns, records))
    }
}

fn matches_predicate(row: &SourceRow, predicate: &Predicate, bind: &BindValue) -> bool {
    let Some(value) = row.get(predicate.column()) else {
        return false;
    };
    match (predicate, bind) {
        (Predicate::Eq { .. }, BindValue::Text(expected)) => value.as_str() == Some(expected.as_str()),
        (Predicate::Eq { .. }, BindValue::Integer(expected)) => value.to_i64() == Some(*expected),
        (Predicate::Like { .. }, BindValue::Text(pattern)) => value
            .as_str()
            .is_some_and(|text| like_match(text, pattern)),
        (Predicate::OnOrAfter { .. }, BindValue::Date(day)) => value
            .as_date()
            .is_some_and(|dt| dt.date() >= *day),
        (Predicate::Before { .. }, BindValue::Date(day)) => {
            value.as_date().is_some_and(|dt| dt.date() < *day)
        }
        _ => false,
    }
}

/// Order values the way Oracle does by default: NULLs sort as the largest
/// value, numbers numerically, everything else by text.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Date(x)), Some(Value::Date(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            match (x.parse::<f64>(), y.parse::<f64>()) {
                (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => x.cmp(y),
            }
        }
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LikeToken {
    Any,
    One,
    Literal(char),
}

fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        let token = match ch {
            '%' => LikeToken::Any,
            '_' => LikeToken::One,
            c if c == LIKE_ESCAPE => LikeToken::Literal(chars.next().unwrap_or(LIKE_ESCAPE)),
            c => LikeToken::Literal(c),
        };
        tokens.push(token);
    }
    tokens
}

/// SQL `LIKE` with `ESCAPE '\'`.
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let tokens = like_tokens(pattern);

    let (mut t, mut p) = (0, 0);
    // Position after the last `%` and the text index it was tried against.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(LikeToken::Any) => {
                backtrack = Some((p + 1, t));
                p += 1;
            }
            Some(LikeToken::One) => {
                t += 1;
                p += 1;
            }
            Some(LikeToken::Literal(c)) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((bp, bt)) => {
                    backtrack = Some((bp, bt + 1));
                    p = bp;
                    t = bt + 1;
                }
                None => return false,
            },
        }
    }

    tokens[p..].iter().all(|tok| *tok == LikeToken::Any)
}

/// Counters and statement log shared by a backend and its sessions.
#[derive(Debug, Default)]
pub struct MemoryProbe {
    opens: AtomicUsize,
    closes: AtomicUsize,
    queries: AtomicUsize,
    read_only_begun: AtomicUsize,
    read_only_ended: AtomicUsize,
    executed: Mutex<Vec<Statement>>,
}

impl MemoryProbe {
    /// Sessions opened.
    pub fn opens(&self) -> usize {
        self.opens.load(AtomicOrdering::SeqCst)
    }

    /// Sessions closed.
    pub fn closes(&self) -> usize {
        self.closes.load(AtomicOrdering::SeqCst)
    }

    /// Statements that reached a session, failed ones included.
    pub fn queries(&self) -> usize {
        self.queries.load(AtomicOrdering::SeqCst)
    }

    pub fn read_only_begun(&self) -> usize {
        self.read_only_begun.load(AtomicOrdering::SeqCst)
    }

    pub fn read_only_ended(&self) -> usize {
        self.read_only_ended.load(AtomicOrdering::SeqCst)
    }

    /// Statements in execution order.
    pub fn executed(&self) -> Vec<Statement> {
        lock(&self.executed).clone()
    }

    /// Most recent statement.
    pub fn last_statement(&self) -> Option<Statement> {
        lock(&self.executed).last().cloned()
    }
}

#[derive(Debug, Default)]
struct Faults {
    refuse_connections: Option<String>,
    failing_tables: HashMap<String, String>,
    drop_after: Option<usize>,
    credentials: Option<(String, String)>,
    fail_close: Option<String>,
}

/// Backend over a shared [`MemoryStore`].
///
/// Clones share the store, probe and faults, so a test can keep one handle
/// while the connection manager owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    store: Arc<Mutex<MemoryStore>>,
    probe: Arc<MemoryProbe>,
    faults: Arc<Mutex<Faults>>,
}

impl MemoryBackend {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            ..Self::default()
        }
    }

    /// Shared probe.
    pub fn probe(&self) -> Arc<MemoryProbe> {
        Arc::clone(&self.probe)
    }

    /// Modify the stored rows.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut MemoryStore) -> R) -> R {
        f(&mut lock(&self.store))
    }

    /// Only accept these credentials when opening sessions.
    pub fn require_credentials(&self, username: &str, password: &str) {
        lock(&self.faults).credentials = Some((username.to_string(), password.to_string()));
    }

    /// Fail every subsequent open with `message`.
    pub fn refuse_connections(&self, message: &str) {
        lock(&self.faults).refuse_connections = Some(message.to_string());
    }

    /// Fail every statement against `table` with `message`.
    pub fn fail_queries_on(&self, table: &Table, message: &str) {
        lock(&self.faults)
            .failing_tables
            .insert(table.name.to_string(), message.to_string());
    }

    /// Fail every subsequent session close with `message`. The session is
    /// still counted as closed.
    pub fn fail_close(&self, message: &str) {
        lock(&self.faults).fail_close = Some(message.to_string());
    }

    /// Lose the connection once a session has run `queries` statements.
    pub fn drop_connection_after(&self, queries: usize) {
        lock(&self.faults).drop_after = Some(queries);
    }
}

impl Backend for MemoryBackend {
    type Session = MemorySession;

    async fn open(&self, config: &DbConfig) -> Result<MemorySession> {
        {
            let faults = lock(&self.faults);
            if let Some(message) = &faults.refuse_connections {
                return Err(Error::connection(message.clone()));
            }
            if let Some((username, password)) = &faults.credentials {
                if config.username() != username || config.password().expose() != password {
                    return Err(Error::connection(ORA_INVALID_LOGON));
                }
            }
        }

        self.probe.opens.fetch_add(1, AtomicOrdering::SeqCst);
        debug!(dsn = config.dsn(), "memory session opened");

        Ok(MemorySession {
            store: Arc::clone(&self.store),
            probe: Arc::clone(&self.probe),
            faults: Arc::clone(&self.faults),
            snapshot: None,
            completed: 0,
            lost: false,
        })
    }
}

/// Session over a [`MemoryBackend`].
#[derive(Debug)]
pub struct MemorySession {
    store: Arc<Mutex<MemoryStore>>,
    probe: Arc<MemoryProbe>,
    faults: Arc<Mutex<Faults>>,
    /// Store contents frozen by `begin_read_only`.
    snapshot: Option<MemoryStore>,
    completed: usize,
    lost: bool,
}

impl Session for MemorySession {
    async fn query(&mut self, statement: &Statement) -> Result<QueryResult> {
        self.probe.queries.fetch_add(1, AtomicOrdering::SeqCst);
        lock(&self.probe.executed).push(statement.clone());

        if self.lost {
            return Err(Error::connection_lost(ORA_END_OF_FILE));
        }

        {
            let faults = lock(&self.faults);
            if faults.drop_after.is_some_and(|limit| self.completed >= limit) {
                self.lost = true;
                return Err(Error::connection_lost(ORA_END_OF_FILE));
            }
            if let Some(message) = faults.failing_tables.get(statement.table_name()) {
                return Err(Error::query(
                    statement.table_name(),
                    statement.sql(),
                    message.clone(),
                ));
            }
        }

        let result = match &self.snapshot {
            Some(snapshot) => snapshot.evaluate(statement),
            None => lock(&self.store).evaluate(statement),
        }?;
        self.completed += 1;
        Ok(result)
    }

    async fn begin_read_only(&mut self) -> Result<()> {
        if self.lost {
            return Err(Error::connection_lost(ORA_END_OF_FILE));
        }
        self.probe.read_only_begun.fetch_add(1, AtomicOrdering::SeqCst);
        self.snapshot = Some(lock(&self.store).clone());
        Ok(())
    }

    async fn end_read_only(&mut self) -> Result<()> {
        self.snapshot = None;
        if self.lost {
            return Err(Error::connection_lost(ORA_END_OF_FILE));
        }
        self.probe.read_only_ended.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.probe.closes.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(message) = &lock(&self.faults).fail_close {
            return Err(Error::connection(message.clone()));
        }
        debug!("memory session closed");
        Ok(())
    }
}
