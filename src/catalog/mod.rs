//! Schema discovery for query-gate.
//!
//! Lists the user tables of the served database and describes one table's
//! columns, with the table name checked before it reaches any lookup.

mod inspector;

pub use inspector::{is_valid_table_name, SchemaInspector};
