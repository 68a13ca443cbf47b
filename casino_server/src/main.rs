//! Roulette table server.
//!
//! Commits roulette wagers and settles rounds against account balances held
//! in PostgreSQL, or in memory for local development.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Error;
use casino::{
    db::{AccountStore, Database, MemoryAccountStore},
    wallet::BalanceReconciler,
};
use casino_server::{
    api,
    config::{ServerConfig, StoreBackend},
    logging, metrics,
};
use log::info;
use pico_args::Arguments;

const HELP: &str = "\
Run the roulette table server

USAGE:
  casino_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/casino_db]

FLAGS:
  --memory                 Keep balances in memory instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  METRICS_BIND             Prometheus scrape address (metrics off when unset)
  ROULETTE_MAX_WAGER       Largest accepted single wager
  MEMORY_SEED_ACCOUNTS     Comma separated account ids for the memory store
  DEFAULT_BALANCE          Starting balance of seeded accounts
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let memory = pargs.contains("--memory");
    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;

    logging::init();

    let config = ServerConfig::from_env(bind, database_url, memory)?;
    config.validate()?;

    info!("Starting roulette server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics exposed at http://{addr}/metrics");
    }

    let store: Arc<dyn AccountStore> = match config.store {
        StoreBackend::Postgres => {
            let db = Database::new(&config.database)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            db.apply_schema()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to apply schema: {}", e))?;
            info!("Database connected successfully");
            Arc::new(db.account_store())
        }
        StoreBackend::Memory => {
            let seed = &config.memory_seed;
            info!(
                "Using in-memory store with {} seeded account(s) at {}",
                seed.accounts.len(),
                seed.default_balance
            );
            Arc::new(MemoryAccountStore::with_accounts(
                seed.accounts.iter().map(|&id| (id, seed.default_balance)),
            ))
        }
    };

    let api_state = api::AppState {
        reconciler: Arc::new(BalanceReconciler::new(store)),
        config: Arc::new(config.roulette.clone()),
    };

    let app = api::create_router(api_state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
