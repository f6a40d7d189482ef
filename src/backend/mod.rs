//! Database backends behind the connection manager.
//!
//! A [`Backend`] opens [`Session`]s; a session runs statements for exactly
//! one logical connection. The manager holds at most one session at a time
//! and takes `&mut` access for every call, so a session is never used from
//! two tasks at once.

pub mod memory;
#[cfg(feature = "oracle")]
pub mod oracle;

use std::future::Future;

use crate::config::DbConfig;
use crate::connection::QueryResult;
use crate::error::Result;
use crate::sql::Statement;

pub use memory::{MemoryBackend, MemoryProbe, MemorySession, MemoryStore};
#[cfg(feature = "oracle")]
pub use self::oracle::{OracleBackend, OracleSession};

/// Opens sessions against a database.
pub trait Backend: Send + Sync {
    /// Session type produced by this backend.
    type Session: Session;

    /// Open a new session with the given credentials.
    ///
    /// Fails with a connection error on bad credentials, unreachable host or
    /// unknown service.
    fn open(&self, config: &DbConfig) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// One open database connection.
pub trait Session: Send {
    /// Execute a read statement and collect its rows.
    fn query(&mut self, statement: &Statement) -> impl Future<Output = Result<QueryResult>> + Send;

    /// Start a read-only transaction covering the following queries.
    fn begin_read_only(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// End the transaction started by [`begin_read_only`](Session::begin_read_only).
    fn end_read_only(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Close the connection.
    fn close(self) -> impl Future<Output = Result<()>> + Send;
}
