//! query-gate - A read-only SQL gateway over SQLite.
//!
//! This library exposes the core modules for use by the binary and the
//! integration tests.

pub mod bootstrap;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod pool;
pub mod query;
pub mod safety;
pub mod server;
