//! Oracle backend over the `oracle` driver crate.
//!
//! The driver is blocking, so every call runs on tokio's blocking pool with
//! the connection behind a mutex. Each value is read according to the
//! column type the server reports: dates as date-times, numbers as their
//! exact decimal text, everything else as text.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ::oracle::sql_type::{OracleType, ToSql};
use ::oracle::{Connection, Row};
use chrono::NaiveDateTime;
use tokio::task;
use tracing::debug;

use super::{Backend, Session};
use crate::config::DbConfig;
use crate::connection::QueryResult;
use crate::error::{Error, Result};
use crate::sql::{BindValue, Statement};
use crate::types::{ColumnKind, Record, Value};

/// Driver error codes meaning the session is gone.
const LOST_CONNECTION_CODES: &[&str] = &[
    "ORA-03113", // end-of-file on communication channel
    "ORA-03114", // not connected to ORACLE
    "ORA-03135", // connection lost contact
    "DPI-1010",  // not connected
    "DPI-1080",  // connection was closed by ORA-%d
];

fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_lost_connection(err: &::oracle::Error) -> bool {
    let message = err.to_string();
    LOST_CONNECTION_CODES
        .iter()
        .any(|code| message.contains(code))
}

fn session_error(err: ::oracle::Error) -> Error {
    if is_lost_connection(&err) {
        Error::connection_lost(err.to_string())
    } else {
        Error::connection(err.to_string())
    }
}

fn join_error(err: task::JoinError) -> Error {
    Error::connection(format!("driver task failed: {}", err))
}

/// Opens [`OracleSession`]s with the Easy Connect string from the config.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleBackend;

impl OracleBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for OracleBackend {
    type Session = OracleSession;

    async fn open(&self, config: &DbConfig) -> Result<OracleSession> {
        let username = config.username().to_string();
        let password = config.password().expose().to_string();
        let connect_string = config.connect_params().connect_string();

        let conn = task::spawn_blocking(move || {
            Connection::connect(&username, &password, &connect_string)
        })
        .await
        .map_err(join_error)?
        .map_err(|e| Error::connection(e.to_string()))?;

        debug!(dsn = config.dsn(), "oracle session opened");
        Ok(OracleSession {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

/// One connection opened by [`OracleBackend`].
pub struct OracleSession {
    conn: Arc<Mutex<Connection>>,
}

impl OracleSession {
    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || f(&lock(&conn)))
            .await
            .map_err(join_error)?
    }
}

/// Owned bind value in the driver's terms.
enum DriverBind {
    Text(String),
    Integer(i64),
}

impl DriverBind {
    fn from_bind(value: &BindValue) -> Self {
        match value {
            BindValue::Text(s) => DriverBind::Text(s.clone()),
            BindValue::Integer(n) => DriverBind::Integer(*n),
            BindValue::Date(d) => DriverBind::Text(d.format("%Y-%m-%d").to_string()),
        }
    }

    fn as_sql(&self) -> &dyn ToSql {
        match self {
            DriverBind::Text(s) => s,
            DriverBind::Integer(n) => n,
        }
    }
}

fn column_kind(oracle_type: &OracleType) -> ColumnKind {
    match oracle_type {
        OracleType::Date
        | OracleType::Timestamp(_)
        | OracleType::TimestampTZ(_)
        | OracleType::TimestampLTZ(_) => ColumnKind::Date,
        OracleType::Number(_, _)
        | OracleType::Float(_)
        | OracleType::BinaryFloat
        | OracleType::BinaryDouble => ColumnKind::Number,
        _ => ColumnKind::Text,
    }
}

fn read_value(row: &Row, index: usize, kind: ColumnKind) -> ::oracle::Result<Value> {
    let value = match kind {
        ColumnKind::Date => row.get::<_, Option<NaiveDateTime>>(index)?.map(Value::Date),
        ColumnKind::Number => row.get::<_, Option<String>>(index)?.map(Value::Number),
        ColumnKind::Text => row.get::<_, Option<String>>(index)?.map(Value::Text),
    };
    Ok(value.unwrap_or(Value::Null))
}

fn fetch(conn: &Connection, statement: &Statement) -> Result<QueryResult> {
    let table = statement.table_name();
    let fail = |err: ::oracle::Error| {
        if is_lost_connection(&err) {
            Error::connection_lost(err.to_string())
        } else {
            Error::query(table, statement.sql(), err.to_string())
        }
    };

    let binds: Vec<(&str, DriverBind)> = statement
        .binds()
        .iter()
        .map(|b| (b.name, DriverBind::from_bind(&b.value)))
        .collect();
    let params: Vec<(&str, &dyn ToSql)> = binds
        .iter()
        .map(|(name, value)| (*name, value.as_sql()))
        .collect();

    let rows = conn.query_named(statement.sql(), &params).map_err(fail)?;

    let kinds: Vec<ColumnKind> = rows
        .column_info()
        .iter()
        .map(|c| column_kind(c.oracle_type()))
        .collect();

    let columns = Arc::new(statement.column_info());
    let mut records = Vec::new();
    for row in rows {
        let row = row.map_err(fail)?;
        let values = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| read_value(&row, i, *kind))
            .collect::<::oracle::Result<Vec<_>>>()
            .map_err(fail)?;
        records.push(Record::new(values, Arc::clone(&columns)));
    }

    Ok(QueryResult::new(columns, records))
}

impl Session for OracleSession {
    async fn query(&mut self, statement: &Statement) -> Result<QueryResult> {
        let statement = statement.clone();
        self.run(move |conn| fetch(conn, &statement)).await
    }

    async fn begin_read_only(&mut self) -> Result<()> {
        self.run(|conn| {
            conn.execute("SET TRANSACTION READ ONLY", &[])
                .map(|_| ())
                .map_err(session_error)
        })
        .await
    }

    async fn end_read_only(&mut self) -> Result<()> {
        self.run(|conn| conn.commit().map_err(session_error)).await
    }

    async fn close(self) -> Result<()> {
        self.run(|conn| conn.close().map_err(session_error)).await?;
        debug!("oracle session closed");
        Ok(())
    }
}
