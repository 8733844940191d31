//! Configuration management for query-gate.
//!
//! Handles loading configuration from TOML files and environment variables.
//! Precedence, highest first: CLI flags, config file, environment, built-in
//! defaults.

use crate::error::{GateError, Result};
use crate::pool::{PoolOptions, DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_MAX_CONNECTIONS};
use crate::query::DEFAULT_QUERY_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

/// Environment variable naming the database file.
pub const ENV_DATABASE: &str = "QUERY_GATE_DATABASE";
/// Environment variable naming the listen address.
pub const ENV_LISTEN: &str = "QUERY_GATE_LISTEN";
/// Environment variable overriding the pool capacity.
pub const ENV_POOL_SIZE: &str = "QUERY_GATE_POOL_SIZE";

/// Main configuration structure for query-gate.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Which database file to serve.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Connection pool sizing and time budgets.
    #[serde(default)]
    pub pool: PoolConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Database location.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Creates a database config from a connection string.
    ///
    /// Format: `sqlite:///absolute/path.db` or `sqlite:relative/path.db`
    pub fn from_connection_string(conn_str: &str) -> Result<Self> {
        let url = Url::parse(conn_str)
            .map_err(|e| GateError::config(format!("Invalid connection string: {e}")))?;

        if url.scheme() != "sqlite" {
            return Err(GateError::config(format!(
                "Invalid scheme '{}'. Expected 'sqlite'",
                url.scheme()
            )));
        }

        let path = url.path();
        if path.is_empty() || path == "/" {
            return Err(GateError::config("Database path is required"));
        }

        Ok(Self {
            path: Some(PathBuf::from(path)),
        })
    }

    /// Parses either a `sqlite:` URL or a plain file path.
    pub fn parse(value: &str) -> Result<Self> {
        if value.starts_with("sqlite:") {
            Self::from_connection_string(value)
        } else {
            Ok(Self {
                path: Some(PathBuf::from(value)),
            })
        }
    }

    /// Returns the configured path or an error explaining how to set one.
    pub fn require_path(&self) -> Result<&Path> {
        self.path.as_deref().ok_or_else(|| {
            GateError::config(format!(
                "No database configured. Use --database, set {ENV_DATABASE}, or add [database] path to the config file"
            ))
        })
    }

    /// Fills an unset path from the environment.
    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if self.path.is_none() {
            if let Some(value) = lookup(ENV_DATABASE) {
                *self = Self::parse(&value)?;
            }
        }
        Ok(())
    }
}

/// Connection pool settings.
///
/// `max_connections` stays `None` until a config file, a CLI flag or the
/// environment sets it, so each layer can tell whether a higher one already did.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolConfig {
    /// Maximum number of live connections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<usize>,

    /// Seconds a request may wait for a free connection.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Seconds a single query may run.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_acquire_timeout_secs() -> u64 {
    DEFAULT_ACQUIRE_TIMEOUT.as_secs()
}

fn default_query_timeout_secs() -> u64 {
    DEFAULT_QUERY_TIMEOUT.as_secs()
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: None,
            acquire_timeout_secs: default_acquire_timeout_secs(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl PoolConfig {
    /// Returns the configured capacity, or the built-in default.
    pub fn max_connections(&self) -> usize {
        self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }

    /// Returns the acquire timeout as a duration.
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Returns the query timeout as a duration.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Converts this section into options for the connection pool.
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions::default()
            .max_connections(self.max_connections())
            .acquire_timeout(self.acquire_timeout())
    }

    /// Applies `QUERY_GATE_POOL_SIZE` when no capacity was configured.
    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if self.max_connections.is_none() {
            if let Some(value) = lookup(ENV_POOL_SIZE) {
                let size = value.parse().map_err(|_| {
                    GateError::config(format!("{ENV_POOL_SIZE} must be a number, got '{value}'"))
                })?;
                self.max_connections = Some(size);
            }
        }
        Ok(())
    }

    /// Rejects values that would make the pool unusable.
    pub fn validate(&self) -> Result<()> {
        if self.max_connections() == 0 {
            return Err(GateError::config("pool.max_connections must be at least 1"));
        }
        if self.query_timeout_secs == 0 {
            return Err(GateError::config("pool.query_timeout_secs must be at least 1"));
        }
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Address to bind. `None` until some layer sets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen: Option<SocketAddr>,

    /// Whether `POST /upload_sql` may replace the database.
    #[serde(default)]
    pub allow_upload: bool,

    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: None,
            allow_upload: false,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    /// Returns the configured listen address, or `0.0.0.0:5000`.
    pub fn listen(&self) -> SocketAddr {
        self.listen.unwrap_or_else(default_listen)
    }

    /// Applies `QUERY_GATE_LISTEN` when no address was configured.
    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if self.listen.is_none() {
            if let Some(value) = lookup(ENV_LISTEN) {
                let listen = value.parse::<SocketAddr>().map_err(|e| {
                    GateError::config(format!("{ENV_LISTEN} is not a socket address: {e}"))
                })?;
                self.listen = Some(listen);
            }
        }
        Ok(())
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("query-gate")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| GateError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            GateError::config(format!("invalid config file {}:\n  {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Fills unset values from `QUERY_GATE_*` environment variables.
    pub fn apply_env_defaults(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Fills unset values using `lookup` in place of the process environment.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        self.database.apply_env_from(&lookup)?;
        self.pool.apply_env_from(&lookup)?;
        self.server.apply_env_from(&lookup)
    }

    /// Checks the merged configuration.
    pub fn validate(&self) -> Result<()> {
        self.pool.validate()
    }
}
