//! Command-line argument parsing for query-gate.
//!
//! Uses clap derive. Flags given here override the config file, which in
//! turn overrides `QUERY_GATE_*` environment variables.

use crate::config::{Config, DatabaseConfig};
use crate::error::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// A read-only SQL gateway over a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "query-gate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// SQLite database file or sqlite: URL
    #[arg(short = 'd', long, global = true, value_name = "DATABASE")]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Serve the HTTP API
    Serve {
        /// Address to listen on (e.g., 127.0.0.1:5000)
        #[arg(short = 'l', long, value_name = "ADDR")]
        listen: Option<SocketAddr>,

        /// Maximum number of pooled connections
        #[arg(short = 'p', long, value_name = "N")]
        pool_size: Option<usize>,

        /// Enable POST /upload_sql
        #[arg(long)]
        allow_upload: bool,
    },

    /// Replace the database with the contents of a SQL script
    Load {
        /// Script to run
        #[arg(value_name = "SQL_FILE")]
        sql_file: PathBuf,

        /// Accept a file without a .sql extension
        #[arg(short = 'f', long)]
        force: bool,
    },

    /// Run one read-only query and print the result as JSON
    Query {
        /// The SQL text
        #[arg(value_name = "SQL")]
        sql: String,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies command-line overrides on top of a loaded config.
    pub fn apply_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(database) = &self.database {
            config.database = DatabaseConfig::parse(database)?;
        }

        if let Command::Serve {
            listen,
            pool_size,
            allow_upload,
        } = &self.command
        {
            if let Some(listen) = listen {
                config.server.listen = Some(*listen);
            }
            if let Some(pool_size) = pool_size {
                config.pool.max_connections = Some(*pool_size);
            }
            if *allow_upload {
                config.server.allow_upload = true;
            }
        }

        Ok(())
    }
}
