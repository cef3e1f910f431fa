//! Credential and task HTTP server.
//!
//! Connects to PostgreSQL, applies the embedded migrations and serves the auth and task
//! routes until interrupted.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use pico_args::Arguments;
use taskdeck::{
    SessionManager, TaskManager,
    db::{Database, PgAccountRepository, PgRefreshTokenLedger, PgTaskRepository},
};
use td_server::{api, config::ServerConfig, logging, metrics};
use tracing::info;

const HELP: &str = "\
Run the taskdeck credential and task server

USAGE:
  td_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  JWT_SECRET               Token signing secret, at least 32 characters (required)
  PASSWORD_PEPPER          Optional secret appended to passwords before hashing
  ACCESS_TOKEN_EXPIRY      Access token lifetime, e.g. 15m
  REFRESH_TOKEN_EXPIRY     Refresh token lifetime, e.g. 7d
  METRICS_BIND             Prometheus listener address, disabled when unset
  (See .env.example for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
}

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

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).context("Failed to install Prometheus exporter")?;
        info!("Metrics available at http://{addr}/metrics");
    }

    info!("Connecting to database");
    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to apply migrations")?;
    info!("Database connected and migrated");

    let pool = db.pool().clone();
    let sessions = SessionManager::new(
        config.auth.clone(),
        Arc::new(PgAccountRepository::new(pool.clone())),
        Arc::new(PgRefreshTokenLedger::new(pool.clone())),
    )
    .context("Invalid authentication configuration")?;
    let tasks = TaskManager::new(Arc::new(PgTaskRepository::new(pool)));

    let state = api::AppState {
        sessions: Arc::new(sessions),
        tasks: Arc::new(tasks),
        database: Some(db.clone()),
    };
    let app = api::create_router(state, config.request_timeout);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
