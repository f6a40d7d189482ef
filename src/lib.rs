//! Read-only access to RAPPORT patient records stored in Oracle.
//!
//! A [`ConnectionManager`] owns one database session; a
//! [`PatientDataFetcher`] borrows it and runs named, parameterized queries
//! against the patient tables, returning [`Record`]s keyed by column name.
//!
//! The Oracle driver backend is behind the `oracle` cargo feature. The
//! [`MemoryBackend`] evaluates the same statements against seeded rows.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "oracle")]
//! # async fn run() -> rapport_patient::Result<()> {
//! use rapport_patient::{ConnectionManager, DbConfig, OracleBackend, PatientDataFetcher};
//!
//! let config = DbConfig::from_env_file(".env")?;
//! let mut db = ConnectionManager::new(OracleBackend::new(), config);
//!
//! let data = db
//!     .scope(|db| {
//!         Box::pin(async move {
//!             PatientDataFetcher::new(db)
//!                 .get_patient_all_data("0000000001")
//!                 .await
//!         })
//!     })
//!     .await?;
//!
//! println!("{} diseases", data.diseases.len());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod connection;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod schema;
pub mod sql;
pub mod types;
pub mod validation;

// Re-export main types
pub use backend::{Backend, MemoryBackend, MemoryProbe, MemoryStore, Session};
#[cfg(feature = "oracle")]
pub use backend::OracleBackend;
pub use config::{ConnectParams, DbConfig, ReadConsistency};
pub use connection::{ConnectionManager, QueryResult};
pub use error::{Error, ErrorKind, Result};
pub use export::{export_to_json, to_json_string};
pub use fetcher::{PatientAllData, PatientDataFetcher, DEFAULT_SEARCH_LIMIT};
pub use types::{ColumnInfo, ColumnKind, Record, Value};
pub use validation::{DateRange, NameMatch, PatientId};
