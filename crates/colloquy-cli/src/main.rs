//! Colloquy CLI entry point.
//!
//! Wires the services together — catalog, store, gateway, auth, engine —
//! and drives the interpreter from a stdin REPL. The real chat transport
//! is a drop-in replacement for the REPL: both only ever call
//! `Interpreter::handle_turn`.

mod config;
mod repl;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use colloquy_auth::AuthManager;
use colloquy_catalog::CommandCatalog;
use colloquy_engine::{EngineConfig, Interpreter};
use colloquy_gateway::ApiClient;
use colloquy_store::{ConversationStore, Database, SessionStore};

use crate::config::AppConfig;

/// Declarative conversational workflow engine.
#[derive(Parser, Debug)]
#[command(name = "colloquy", version, about)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "config/default.toml")]
    config: String,

    /// Command catalog directory (overrides the config file).
    #[arg(long)]
    commands_dir: Option<String>,

    /// SQLite database path (overrides the config file).
    #[arg(long)]
    database: Option<String>,

    /// Identity to converse as.
    #[arg(long, default_value = "local")]
    identity: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "colloquy=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config);
    if let Some(dir) = cli.commands_dir {
        config.commands_dir = dir;
    }
    if let Some(db) = cli.database {
        config.database_path = db;
    }

    // A malformed catalog blocks startup; nothing recoverable about it.
    let catalog = Arc::new(
        CommandCatalog::load_dir(&config.commands_dir)
            .with_context(|| format!("loading command catalog from `{}`", config.commands_dir))?,
    );
    info!(commands = catalog.len(), "catalog ready");

    if let Some(parent) = Path::new(&config.database_path).parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory `{}`", parent.display()))?;
    }
    let db = Database::open_and_migrate(config.database_path.clone())
        .await
        .context("opening database")?;

    let sessions = SessionStore::new(db.clone());
    let conversations = ConversationStore::new(db);

    let transport = Arc::new(ApiClient::new(Duration::from_secs(
        config.request_timeout_secs,
    )));
    let auth = Arc::new(AuthManager::new(
        sessions,
        transport.clone(),
        config.login_url.clone(),
    ));

    let interpreter = Interpreter::new(
        catalog,
        conversations,
        auth,
        transport,
        EngineConfig {
            match_threshold: config.match_threshold,
            max_invalid_attempts: config.max_invalid_attempts,
        },
    );

    info!(identity = %cli.identity, "starting REPL");
    let stdin = std::io::stdin().lock();
    let stdout = std::io::stdout().lock();
    repl::run(&interpreter, &cli.identity, stdin, stdout).await?;

    Ok(())
}
