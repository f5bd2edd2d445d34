//! HTTP front end for the budget_max authentication service.
//!
//! - [`api`]: axum router, handlers and middleware
//! - [`config`]: Environment-driven server configuration
//! - [`logging`]: `tracing` subscriber setup and security event helpers

pub mod api;
pub mod config;
pub mod logging;
