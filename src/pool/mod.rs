//! Bounded connection pooling for query-gate.
//!
//! Hands out exclusive connection guards, takes healthy connections back,
//! and throws away any connection that failed during use. The pool is
//! generic over a [`Connector`] so the lifecycle rules can be exercised
//! without a database.

mod connection_pool;

pub use connection_pool::{ConnectionPool, PooledConnection};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Default number of live connections (sized for a few dozen concurrent users).
pub const DEFAULT_MAX_CONNECTIONS: usize = 50;

/// Default time a caller may wait for a free connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while obtaining a connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Every connection stayed busy for the whole wait budget.
    #[error("connection pool exhausted after waiting {}ms", .0.as_millis())]
    Exhausted(Duration),

    /// Opening a new connection failed.
    #[error("could not open database connection: {0}")]
    Connect(String),

    /// The pool has been shut down.
    #[error("connection pool is closed")]
    Closed,
}

/// Opens new connections for a [`ConnectionPool`].
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The connection type handed out by the pool.
    type Connection: Send + 'static;

    /// Opens a brand new connection.
    async fn connect(&self) -> Result<Self::Connection, PoolError>;
}

/// Sizing and wait limits for a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Upper bound on live connections (idle plus checked out).
    pub max_connections: usize,
    /// How long `acquire` may wait for a free slot.
    pub acquire_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

impl PoolOptions {
    /// Sets the maximum number of live connections.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the acquire timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Point-in-time view of the pool's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PoolStatus {
    /// Configured maximum of live connections.
    pub capacity: usize,
    /// Connections that exist (or are being opened) right now.
    pub live: usize,
    /// Connections waiting in the idle set.
    pub idle: usize,
    /// Connections checked out by callers, including ones still opening.
    pub in_use: usize,
    /// Bumped every time the pool is invalidated.
    pub generation: u64,
}
