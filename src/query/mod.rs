//! Query execution for query-gate.
//!
//! Ties the classification gate, the connection pool and result conversion
//! together for one ad hoc statement.

pub mod executor;

pub use executor::{QueryExecutor, DEFAULT_QUERY_TIMEOUT};
