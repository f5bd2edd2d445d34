//! Authentication server for budget_max.
//!
//! Sessions and users live in PostgreSQL, failed-login counters in Redis.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use budget_auth::{
    AuthManager,
    db::{Database, PgRefreshTokenRepository, PgSessionRepository, PgUserRepository},
    security::RedisCounterStore,
};
use budget_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging,
};
use pico_args::Arguments;
use tracing::info;

const HELP: &str = "\
Run the budget_max authentication server

USAGE:
  budget_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  REDIS_URL                Redis connection string for login rate limiting
  JWT_SECRET               Interim 2FA token signing secret (>= 32 chars)
  PASSWORD_PEPPER          Password hashing pepper (>= 16 chars)
  RATE_LIMIT_LOGIN_*       ATTEMPTS, WINDOW_SECS and LOCKOUT_SECS for failed logins
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let bind: Option<SocketAddr> = pargs
        .opt_value_from_str("--bind")
        .context("Invalid --bind address")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;

    logging::init();

    let config = ServerConfig::from_env(bind, database_url)?;
    info!("Starting authentication server at {}", config.bind);

    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to run migrations")?;
    info!("Database connected and migrated");

    let counters = RedisCounterStore::connect(&config.redis_url)
        .await
        .context("Failed to connect to Redis")?;
    info!("Redis connected");

    let pool = db.pool().clone();
    let auth_manager = Arc::new(AuthManager::new(
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(PgSessionRepository::new(pool.clone())),
        Arc::new(PgRefreshTokenRepository::new(pool)),
        Arc::new(counters.clone()),
        &config.auth_config(),
    ));

    let state = AppState {
        auth_manager,
        database: Some(db.clone()),
        counters: Some(counters),
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
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
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
