//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use budget_auth::{AuthConfig, db::DatabaseConfig, security::RateLimitConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const DEFAULT_BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 6969);
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

const MIN_JWT_SECRET_LEN: usize = 32;
const MIN_PEPPER_LEN: usize = 16;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Redis URL for the login attempt counters
    pub redis_url: String,
    /// Security configuration
    pub security: SecurityConfig,
    /// Failed-login throttling
    pub login_rate_limit: RateLimitConfig,
}

/// Security-related configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// JWT signing secret for interim 2FA tokens (required)
    pub jwt_secret: String,
    /// Password hashing pepper (required)
    pub password_pepper: String,
    /// Issuer shown in authenticator apps
    pub totp_issuer: String,
    /// Session lifetime in seconds
    pub session_ttl_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: i64,
    /// Interim 2FA token lifetime in seconds
    pub interim_ttl_secs: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => match std::env::var("SERVER_BIND") {
                Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "SERVER_BIND".to_string(),
                    reason: format!("'{}' is not an IP:PORT address", raw),
                })?,
                Err(_) => DEFAULT_BIND,
            },
        };

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string());

        // Security configuration (REQUIRED)
        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let password_pepper =
            std::env::var("PASSWORD_PEPPER").map_err(|_| ConfigError::MissingRequired {
                var: "PASSWORD_PEPPER".to_string(),
                hint: "Generate with: openssl rand -hex 16".to_string(),
            })?;

        let defaults = AuthConfig::new(String::new(), String::new());
        let security = SecurityConfig {
            jwt_secret,
            password_pepper,
            totp_issuer: std::env::var("TOTP_ISSUER").unwrap_or(defaults.totp_issuer),
            session_ttl_secs: parse_env_or("SESSION_TTL_SECS", defaults.session_ttl_secs),
            refresh_ttl_secs: parse_env_or("REFRESH_TOKEN_TTL_SECS", defaults.refresh_ttl_secs),
            interim_ttl_secs: parse_env_or("TWO_FACTOR_TOKEN_TTL_SECS", defaults.interim_ttl_secs),
        };

        let config = ServerConfig {
            bind,
            database,
            redis_url,
            security,
            login_rate_limit: RateLimitConfig::login(),
        };
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: format!("Must be at least {} characters", MIN_JWT_SECRET_LEN),
            });
        }

        if self.security.password_pepper.len() < MIN_PEPPER_LEN {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: format!("Must be at least {} characters", MIN_PEPPER_LEN),
            });
        }

        // Authenticator labels use ':' to split issuer from account
        if self.security.totp_issuer.contains(':') {
            return Err(ConfigError::Invalid {
                var: "TOTP_ISSUER".to_string(),
                reason: "Must not contain ':'".to_string(),
            });
        }

        for (var, secs) in [
            ("SESSION_TTL_SECS", self.security.session_ttl_secs),
            ("REFRESH_TOKEN_TTL_SECS", self.security.refresh_ttl_secs),
            ("TWO_FACTOR_TOKEN_TTL_SECS", self.security.interim_ttl_secs),
        ] {
            if secs <= 0 {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }
        }

        if self.security.refresh_ttl_secs <= self.security.session_ttl_secs {
            return Err(ConfigError::Invalid {
                var: "REFRESH_TOKEN_TTL_SECS".to_string(),
                reason: format!(
                    "Must be longer than the session lifetime ({}s)",
                    self.security.session_ttl_secs
                ),
            });
        }

        if self.login_rate_limit.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "RATE_LIMIT_LOGIN_ATTEMPTS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.login_rate_limit.lockout_secs == 0 || self.login_rate_limit.window_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "RATE_LIMIT_LOGIN_LOCKOUT_SECS".to_string(),
                reason: "Lockout and window must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Settings for [`budget_auth::AuthManager`]
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            jwt_secret: self.security.jwt_secret.clone(),
            password_pepper: self.security.password_pepper.clone(),
            totp_issuer: self.security.totp_issuer.clone(),
            session_ttl_secs: self.security.session_ttl_secs,
            refresh_ttl_secs: self.security.refresh_ttl_secs,
            interim_ttl_secs: self.security.interim_ttl_secs,
            login_rate_limit: self.login_rate_limit.clone(),
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            database: DatabaseConfig::development(),
            redis_url: DEFAULT_REDIS_URL.to_string(),
            security: SecurityConfig {
                jwt_secret: "a".repeat(32),
                password_pepper: "b".repeat(16),
                totp_issuer: "BudgetMax".to_string(),
                session_ttl_secs: 900,
                refresh_ttl_secs: 86_400,
                interim_ttl_secs: 300,
            },
            login_rate_limit: RateLimitConfig::default(),
        }
    }

    fn clear_env() {
        unsafe {
            for var in [
                "SERVER_BIND",
                "REDIS_URL",
                "JWT_SECRET",
                "PASSWORD_PEPPER",
                "SESSION_TTL_SECS",
            ] {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Use openssl".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("JWT_SECRET"));
        assert!(msg.contains("Use openssl"));
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let mut config = config();
        config.security.jwt_secret = "short".to_string();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "JWT_SECRET"));
    }

    #[test]
    fn test_short_pepper_rejected() {
        let mut config = config();
        config.security.password_pepper = "x".repeat(15);

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "PASSWORD_PEPPER"));
    }

    #[test]
    fn test_totp_issuer_with_colon_rejected() {
        let mut config = config();
        config.security.totp_issuer = "Budget:Max".to_string();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "TOTP_ISSUER"));
    }

    #[test]
    fn test_refresh_must_outlive_session() {
        let mut config = config();
        config.security.refresh_ttl_secs = config.security.session_ttl_secs;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = config();
        config.login_rate_limit.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_auth_config_carries_settings() {
        let auth = config().auth_config();
        assert_eq!(auth.jwt_secret, "a".repeat(32));
        assert_eq!(auth.session_ttl_secs, 900);
        assert_eq!(auth.login_rate_limit, RateLimitConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_requires_jwt_secret() {
        clear_env();

        let err = ServerConfig::from_env(None, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { ref var, .. } if var == "JWT_SECRET"));
    }

    #[test]
    #[serial]
    fn test_from_env_with_overrides() {
        clear_env();
        unsafe {
            std::env::set_var("JWT_SECRET", "s".repeat(40));
            std::env::set_var("PASSWORD_PEPPER", "p".repeat(20));
            std::env::set_var("SESSION_TTL_SECS", "600");
        }

        let config = ServerConfig::from_env(
            Some("0.0.0.0:9000".parse().unwrap()),
            Some("postgres://override@localhost/db".to_string()),
        );
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.database.database_url, "postgres://override@localhost/db");
        assert_eq!(config.redis_url, DEFAULT_REDIS_URL);
        assert_eq!(config.security.session_ttl_secs, 600);
        assert_eq!(config.security.refresh_ttl_secs, 86_400);
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_bind() {
        clear_env();
        unsafe {
            std::env::set_var("SERVER_BIND", "not-an-address");
            std::env::set_var("JWT_SECRET", "s".repeat(40));
            std::env::set_var("PASSWORD_PEPPER", "p".repeat(20));
        }

        let result = ServerConfig::from_env(None, None);
        clear_env();

        assert!(matches!(result, Err(ConfigError::Invalid { ref var, .. }) if var == "SERVER_BIND"));
    }
}
