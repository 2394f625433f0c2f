//! Task List Server
//!
//! HTTP service for a graph of tasks linked by successor edges.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tasklist_server::auth::TokenStore;
use tasklist_server::cli::{Cli, Command};
use tasklist_server::config::Config;
use tasklist_server::db::Database;
use tasklist_server::logging;
use tasklist_server::server::{AppState, start_server};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log, cli.verbose)?;

    let mut config = Config::load_or_default(cli.config.as_deref())?;

    // CLI flags win over file and environment values
    if let Some(db_path) = &cli.database {
        config.database.path = db_path.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    debug!(?config, "Resolved configuration");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await,
    }
}

async fn run_server(config: Config) -> Result<()> {
    config.ensure_db_dir()?;
    let db = Database::open_with_timeout(&config.database.path, config.database.busy_timeout())?;
    info!(path = %config.database.path.display(), "Database ready");

    let tokens = Arc::new(TokenStore::seeded(config.debug.token_map.clone()));
    let state = AppState::new(db, tokens, config.tasks.scope);

    let handle = start_server(state, &config.server).await?;

    tokio::signal::ctrl_c().await?;
    info!("Received interrupt");
    handle.shutdown().await;

    Ok(())
}
