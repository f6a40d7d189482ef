//! Database configuration.
//!
//! Credentials are resolved once, typically from a git-ignored `.env` file,
//! and passed explicitly to [`ConnectionManager`](crate::ConnectionManager).
//! Nothing here reads or writes the process environment.

use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Default Oracle listener port.
pub const DEFAULT_PORT: u16 = 1521;

/// Env file key holding the database user.
pub const USERNAME_KEY: &str = "RAPPORT_DB_USERNAME";
/// Env file key holding the database password.
pub const PASSWORD_KEY: &str = "RAPPORT_DB_PASSWORD";
/// Env file key holding the DSN (`host:port/service_name`).
pub const DSN_KEY: &str = "RAPPORT_DB_DSN";
/// Optional env file key selecting the [`ReadConsistency`].
pub const READ_CONSISTENCY_KEY: &str = "RAPPORT_READ_CONSISTENCY";

/// Parsed DSN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    /// Host address.
    pub host: String,
    /// Port number.
    pub port: u16,
    /// Service name.
    pub service_name: String,
}

impl ConnectParams {
    /// Create new connection parameters.
    pub fn new(host: impl Into<String>, port: u16, service_name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            service_name: service_name.into(),
        }
    }

    /// Parse a connection string like "host:port/service_name".
    pub fn parse(conn_str: &str) -> Result<Self> {
        // Format: host:port/service_name or host/service_name (default port 1521)
        let (addr_part, service_name) =
            conn_str
                .trim()
                .split_once('/')
                .ok_or_else(|| Error::InvalidConnectString {
                    message: "Expected format: host:port/service_name".to_string(),
                })?;

        let (host, port) = if let Some((h, p)) = addr_part.split_once(':') {
            let port = p.parse::<u16>().map_err(|_| Error::InvalidConnectString {
                message: format!("Invalid port: {}", p),
            })?;
            (h, port)
        } else {
            (addr_part, DEFAULT_PORT)
        };

        if host.is_empty() {
            return Err(Error::InvalidConnectString {
                message: "Missing host".to_string(),
            });
        }
        if service_name.is_empty() {
            return Err(Error::InvalidConnectString {
                message: "Missing service name".to_string(),
            });
        }

        Ok(Self::new(host, port, service_name))
    }

    /// Easy Connect string handed to the driver.
    pub fn connect_string(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.service_name)
    }
}

/// How the composed "all data" fetch reads its four tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadConsistency {
    /// Four independent reads; rows committed between them may show up in
    /// some sections and not others.
    #[default]
    Independent,
    /// Four reads inside one read-only transaction.
    Snapshot,
}

impl FromStr for ReadConsistency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "independent" => Ok(Self::Independent),
            "snapshot" => Ok(Self::Snapshot),
            other => Err(Error::InvalidConfigValue {
                key: READ_CONSISTENCY_KEY,
                message: format!("expected 'independent' or 'snapshot', got {:?}", other),
            }),
        }
    }
}

/// Password wrapper that never prints its contents.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Borrow the secret for handing to the driver.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Credentials and options for one database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    username: String,
    password: Password,
    dsn: String,
    connect_params: ConnectParams,
    read_consistency: ReadConsistency,
}

impl DbConfig {
    /// Build a configuration from explicit values.
    ///
    /// The DSN is parsed eagerly so a malformed one fails here rather than on
    /// the first connection attempt.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        dsn: impl Into<String>,
    ) -> Result<Self> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(Error::InvalidConfigValue {
                key: USERNAME_KEY,
                message: "username cannot be empty".into(),
            });
        }
        let dsn = dsn.into();
        let connect_params = ConnectParams::parse(&dsn)?;

        Ok(Self {
            username,
            password: Password(password.into()),
            dsn,
            connect_params,
            read_consistency: ReadConsistency::default(),
        })
    }

    /// Load a configuration from a dotenv-style file.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rapport_patient::DbConfig;
    ///
    /// let config = DbConfig::from_env_file(".env")?;
    /// # Ok::<(), rapport_patient::Error>(())
    /// ```
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut username = None;
        let mut password = None;
        let mut dsn = None;
        let mut consistency = None;

        for item in dotenvy::from_path_iter(path.as_ref())? {
            let (key, value) = item?;
            match key.as_str() {
                USERNAME_KEY => username = Some(value),
                PASSWORD_KEY => password = Some(value),
                DSN_KEY => dsn = Some(value),
                READ_CONSISTENCY_KEY => consistency = Some(value),
                _ => {}
            }
        }

        let config = Self::new(
            username.ok_or(Error::MissingConfig { key: USERNAME_KEY })?,
            password.ok_or(Error::MissingConfig { key: PASSWORD_KEY })?,
            dsn.ok_or(Error::MissingConfig { key: DSN_KEY })?,
        )?;

        match consistency {
            Some(value) => Ok(config.with_read_consistency(value.parse()?)),
            None => Ok(config),
        }
    }

    /// Set the read consistency used by composed fetches.
    pub fn with_read_consistency(mut self, consistency: ReadConsistency) -> Self {
        self.read_consistency = consistency;
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &Password {
        &self.password
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    pub fn connect_params(&self) -> &ConnectParams {
        &self.connect_params
    }

    pub fn read_consistency(&self) -> ReadConsistency {
        self.read_consistency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_connect_params_parse() {
        let params = ConnectParams::parse("dbhost:1521/RAPPORT").unwrap();
        assert_eq!(params.host, "dbhost");
        assert_eq!(params.port, 1521);
        assert_eq!(params.service_name, "RAPPORT");

        // Test default port
        let params = ConnectParams::parse("dbhost/RAPPORT").unwrap();
        assert_eq!(params.port, DEFAULT_PORT);
        assert_eq!(params.connect_string(), "dbhost:1521/RAPPORT");
    }

    #[test]
    fn test_connect_params_rejects_malformed() {
        assert!(matches!(
            ConnectParams::parse("dbhost:1521"),
            Err(Error::InvalidConnectString { .. })
        ));
        assert!(matches!(
            ConnectParams::parse("dbhost:port/RAPPORT"),
            Err(Error::InvalidConnectString { .. })
        ));
        assert!(ConnectParams::parse(":1521/RAPPORT").is_err());
        assert!(ConnectParams::parse("dbhost:1521/").is_err());
    }

    #[test]
    fn test_password_is_redacted() {
        let config = DbConfig::new("rapport", "s3cret", "dbhost:1521/RAPPORT").unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("Password(***)"));
        assert_eq!(config.password().expose(), "s3cret");
    }

    #[test]
    fn test_empty_username_rejected() {
        let err = DbConfig::new("  ", "pw", "dbhost/RAPPORT").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { key: USERNAME_KEY, .. }));
    }

    #[test]
    fn test_read_consistency_from_str() {
        assert_eq!("snapshot".parse::<ReadConsistency>().unwrap(), ReadConsistency::Snapshot);
        assert_eq!(
            " Independent ".parse::<ReadConsistency>().unwrap(),
            ReadConsistency::Independent
        );
        assert!("serializable".parse::<ReadConsistency>().is_err());
    }

    #[test]
    fn test_from_env_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# local credentials").unwrap();
        writeln!(file, "RAPPORT_DB_USERNAME=rapport_ro").unwrap();
        writeln!(file, "RAPPORT_DB_PASSWORD=\"pa ss\"").unwrap();
        writeln!(file, "RAPPORT_DB_DSN=10.0.0.5:1522/RAPPORTPDB").unwrap();
        writeln!(file, "RAPPORT_READ_CONSISTENCY=snapshot").unwrap();

        let config = DbConfig::from_env_file(file.path()).unwrap();
        assert_eq!(config.username(), "rapport_ro");
        assert_eq!(config.password().expose(), "pa ss");
        assert_eq!(config.dsn(), "10.0.0.5:1522/RAPPORTPDB");
        assert_eq!(config.connect_params().port, 1522);
        assert_eq!(config.read_consistency(), ReadConsistency::Snapshot);
    }

    #[test]
    fn test_from_env_file_missing_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "RAPPORT_DB_USERNAME=rapport_ro").unwrap();
        writeln!(file, "RAPPORT_DB_DSN=dbhost/RAPPORT").unwrap();

        let err = DbConfig::from_env_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::MissingConfig { key: PASSWORD_KEY }));
    }

    #[test]
    fn test_from_env_file_not_found() {
        let err = DbConfig::from_env_file("/nonexistent/rapport.env").unwrap_err();
        assert!(matches!(err, Error::EnvFile(_)));
    }
}
