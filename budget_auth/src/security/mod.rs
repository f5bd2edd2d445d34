//! Security module providing login rate limiting.
//!
//! Failed logins are counted per normalised email in a shared
//! [`CounterStore`] (Redis in production):
//!
//! - `login_attempts:<email>` counts failures and expires after the window
//!   (10 minutes by default, refreshed on every failure)
//! - `login_lock:<email>` is set once the limit (5 by default) is reached and
//!   expires after the lockout (5 minutes by default)
//!
//! A successful login clears both keys.
//!
//! ## Example
//!
//! ```no_run
//! use budget_auth::security::{RateLimitConfig, RateLimiter, RedisCounterStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RedisCounterStore::connect("redis://127.0.0.1:6379").await?;
//!     let limiter = RateLimiter::new(Arc::new(store), RateLimitConfig::login());
//!
//!     let result = limiter.record_failure("player@example.com").await?;
//!     if !result.is_allowed() {
//!         println!("Locked, retry after {:?} seconds", result.retry_after());
//!     }
//!     Ok(())
//! }
//! ```

pub mod counter_store;
pub mod errors;
pub mod rate_limiter;

pub use counter_store::{CounterStore, InMemoryCounterStore, RedisCounterStore};
pub use errors::{RateLimitError, RateLimiterResult};
pub use rate_limiter::{RateLimitConfig, RateLimitResult, RateLimiter, normalize_identity};
