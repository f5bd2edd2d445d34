//! Failed-login throttling on top of a shared counter store.

use super::{counter_store::CounterStore, errors::RateLimiterResult};
use std::{sync::Arc, time::Duration};

const ATTEMPTS_PREFIX: &str = "login_attempts";
const LOCK_PREFIX: &str = "login_lock";

/// Rate limit configuration for an endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Failures allowed before the identity is locked
    pub max_attempts: u32,

    /// Lifetime of the failure counter in seconds, refreshed on every failure
    pub window_secs: u64,

    /// Lockout duration in seconds after reaching the limit
    pub lockout_secs: u64,
}

fn env_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl RateLimitConfig {
    /// Configuration for login endpoint
    pub fn login() -> Self {
        Self {
            max_attempts: env_or("RATE_LIMIT_LOGIN_ATTEMPTS", 5),
            window_secs: env_or("RATE_LIMIT_LOGIN_WINDOW_SECS", 600),
            lockout_secs: env_or("RATE_LIMIT_LOGIN_LOCKOUT_SECS", 300),
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn lockout(&self) -> Duration {
        Duration::from_secs(self.lockout_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_secs: 600,
            lockout_secs: 300,
        }
    }
}

/// Rate limit check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Further failures are still tolerated
    Allowed { remaining: u32 },

    /// Identity is locked out
    Locked { retry_after: u64 },
}

impl RateLimitResult {
    /// Check if action is allowed
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    /// Get remaining attempts (if allowed)
    pub fn remaining(&self) -> Option<u32> {
        match self {
            RateLimitResult::Allowed { remaining } => Some(*remaining),
            _ => None,
        }
    }

    /// Get retry after seconds (if locked)
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            RateLimitResult::Locked { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Normalise a login identity (email) into its counter key suffix
pub fn normalize_identity(identity: &str) -> String {
    identity.trim().to_lowercase()
}

/// Counts failed logins per identity and locks the identity once the limit is hit.
///
/// State lives entirely in the [`CounterStore`], so every server instance
/// sharing one Redis sees the same counters.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn keys(identity: &str) -> (String, String) {
        let id = normalize_identity(identity);
        (
            format!("{}:{}", ATTEMPTS_PREFIX, id),
            format!("{}:{}", LOCK_PREFIX, id),
        )
    }

    /// Record one failed attempt
    ///
    /// A locked identity stays locked without touching the counter. The
    /// failure that reaches `max_attempts` sets the lock and is itself
    /// reported as `Locked`.
    pub async fn record_failure(&self, identity: &str) -> RateLimiterResult<RateLimitResult> {
        let (attempts_key, lock_key) = Self::keys(identity);

        if self.store.exists(&lock_key).await? {
            return Ok(RateLimitResult::Locked {
                retry_after: self.config.lockout_secs,
            });
        }

        let attempts = self
            .store
            .increment_with_expiry(&attempts_key, self.config.window())
            .await?;

        if attempts >= u64::from(self.config.max_attempts) {
            self.store
                .set(&lock_key, "1", self.config.lockout())
                .await?;
            log::warn!(
                "Login locked for {} seconds after {} failed attempts",
                self.config.lockout_secs,
                attempts
            );
            return Ok(RateLimitResult::Locked {
                retry_after: self.config.lockout_secs,
            });
        }

        Ok(RateLimitResult::Allowed {
            remaining: self.config.max_attempts.saturating_sub(attempts as u32),
        })
    }

    /// Whether `identity` is currently locked out
    pub async fn is_locked(&self, identity: &str) -> RateLimiterResult<bool> {
        let (_, lock_key) = Self::keys(identity);
        self.store.exists(&lock_key).await
    }

    /// Reset rate limit for an identity
    pub async fn reset(&self, identity: &str) -> RateLimiterResult<()> {
        let (attempts_key, lock_key) = Self::keys(identity);
        self.store.delete(&[&attempts_key, &lock_key]).await
    }
}
