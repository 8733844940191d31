//! query-gate - A read-only SQL gateway over SQLite.

use std::sync::Arc;

use query_gate::bootstrap::DatabaseLoader;
use query_gate::cli::{Cli, Command};
use query_gate::config::Config;
use query_gate::db::{open_pool, DbPool};
use query_gate::error::{GateError, Result};
use query_gate::logging;
use query_gate::query::QueryExecutor;
use query_gate::server::{self, AppState};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;

    // CLI flags first, so the environment only fills what is still unset.
    cli.apply_overrides(&mut config)?;
    config.apply_env_defaults()?;
    config.validate()?;

    let db_path = config.database.require_path()?.to_path_buf();
    let pool = Arc::new(open_pool(&db_path, &config.pool));

    match cli.command {
        Command::Serve { .. } => {
            let loader = DatabaseLoader::new(&db_path, Arc::clone(&pool));
            let state = AppState::new(pool, loader, &config.pool, &config.server);
            server::serve(state, &config.server, shutdown_on_ctrl_c()).await
        }
        Command::Load { sql_file, force } => {
            let loader = DatabaseLoader::new(&db_path, Arc::clone(&pool));
            let summary = loader.load_file(&sql_file, force).await?;
            println!(
                "Loaded {} into {} ({} tables)",
                sql_file.display(),
                db_path.display(),
                summary.tables.len()
            );
            for table in &summary.tables {
                println!("  - {table}");
            }
            Ok(())
        }
        Command::Query { sql, pretty } => run_query(&pool, &config, &sql, pretty).await,
    }
}

async fn run_query(pool: &DbPool, config: &Config, sql: &str, pretty: bool) -> Result<()> {
    let result = QueryExecutor::new(pool)
        .with_timeout(config.pool.query_timeout())
        .execute(sql)
        .await;
    pool.close();

    let result = result?;
    let json = if pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    }
    .map_err(|e| GateError::internal(format!("cannot encode result: {e}")))?;
    println!("{json}");
    Ok(())
}

/// Returns a token that is cancelled when the process receives Ctrl-C.
fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                trigger.cancel();
            }
            Err(e) => warn!("Cannot listen for Ctrl-C, graceful shutdown disabled: {e}"),
        }
    });
    token
}
