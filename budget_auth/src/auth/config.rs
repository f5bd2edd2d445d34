//! Authentication settings.

use crate::security::RateLimitConfig;
use chrono::Duration;

/// Settings shared by every authentication component.
///
/// Built once at startup and handed to [`AuthManager`](super::AuthManager);
/// nothing in this crate reads secrets from the environment on its own.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 secret for interim 2FA tokens
    pub jwt_secret: String,

    /// Server-side pepper appended to passwords before hashing
    pub password_pepper: String,

    /// Issuer shown in authenticator apps
    pub totp_issuer: String,

    /// Session lifetime in seconds
    pub session_ttl_secs: i64,

    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: i64,

    /// Interim 2FA token lifetime in seconds
    pub interim_ttl_secs: i64,

    /// Failed-login throttling
    pub login_rate_limit: RateLimitConfig,
}

impl AuthConfig {
    /// Default lifetimes and throttling with the given secrets
    pub fn new(jwt_secret: impl Into<String>, password_pepper: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            password_pepper: password_pepper.into(),
            totp_issuer: "BudgetMax".to_string(),
            session_ttl_secs: 15 * 60,
            refresh_ttl_secs: 24 * 60 * 60,
            interim_ttl_secs: 5 * 60,
            login_rate_limit: RateLimitConfig::default(),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.session_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::seconds(self.refresh_ttl_secs)
    }

    pub fn interim_ttl(&self) -> Duration {
        Duration::seconds(self.interim_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_lifetimes() {
        let config = AuthConfig::new("a".repeat(32), "b".repeat(16));
        assert_eq!(config.session_ttl(), Duration::minutes(15));
        assert_eq!(config.refresh_ttl(), Duration::hours(24));
        assert_eq!(config.interim_ttl(), Duration::minutes(5));
        assert_eq!(config.totp_issuer, "BudgetMax");
    }

    #[test]
    #[serial]
    fn test_new_ignores_rate_limit_env() {
        unsafe {
            std::env::set_var("RATE_LIMIT_LOGIN_ATTEMPTS", "1");
        }
        let config = AuthConfig::new("a".repeat(32), "b".repeat(16));
        unsafe {
            std::env::remove_var("RATE_LIMIT_LOGIN_ATTEMPTS");
        }

        assert_eq!(config.login_rate_limit, RateLimitConfig::default());
    }
}
