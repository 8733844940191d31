//! Replacing the served database from a SQL script.
//!
//! A script is loaded into a fresh file next to the live database and only
//! swapped in once every statement has run, so a broken script never leaves
//! the gateway serving a half-built database.

mod loader;

pub use loader::{check_script_name, DatabaseLoader, LoadSummary};
