//! # Budget Auth
//!
//! Authentication and session lifecycle for the budget_max backend.
//!
//! A user signs up with an email and password, logs in, and receives an
//! opaque session token plus a refresh token. Users who enabled TOTP two-factor
//! authentication first receive a short-lived interim token and finish the
//! login with a code. Repeated failed logins lock the email for a while.
//!
//! ## Core Modules
//!
//! - [`auth`]: Password hashing, TOTP, interim tokens, sessions and the
//!   [`AuthManager`] that orchestrates every flow
//! - [`security`]: Login rate limiting over a Redis-style counter store
//! - [`db`]: PostgreSQL pool, migrations and repository traits with
//!   PostgreSQL and in-memory implementations
//!
//! ## Example
//!
//! ```no_run
//! use budget_auth::{AuthConfig, AuthManager};
//! use budget_auth::db::{
//!     Database, DatabaseConfig, PgRefreshTokenRepository, PgSessionRepository, PgUserRepository,
//! };
//! use budget_auth::security::RedisCounterStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()).await?;
//!     db.migrate().await?;
//!     let counters = RedisCounterStore::connect("redis://127.0.0.1:6379").await?;
//!
//!     let config = AuthConfig::new("a-jwt-secret-of-at-least-32-chars!!", "pepper-16-chars!");
//!     let auth = AuthManager::new(
//!         Arc::new(PgUserRepository::new(db.pool().clone())),
//!         Arc::new(PgSessionRepository::new(db.pool().clone())),
//!         Arc::new(PgRefreshTokenRepository::new(db.pool().clone())),
//!         Arc::new(counters),
//!         &config,
//!     );
//!     # let _ = auth;
//!     Ok(())
//! }
//! ```

/// Authentication flows, tokens and sessions.
pub mod auth;
pub use auth::{AuthConfig, AuthError, AuthManager, AuthResult, ErrorKind};

/// PostgreSQL access and repositories.
pub mod db;

/// Login rate limiting.
pub mod security;
