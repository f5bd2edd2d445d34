//! Authentication module providing user registration, login, and session management.
//!
//! This module implements:
//! - Argon2id password hashing with server-side pepper
//! - Opaque session tokens (15-minute expiry) with rotating refresh tokens
//!   (24-hour expiry, single use)
//! - Two-factor authentication (TOTP) with a short-lived interim token between
//!   the password step and the code step
//! - Failed-login lockout through [`crate::security::RateLimiter`]
//!
//! ## Example
//!
//! ```no_run
//! use budget_auth::auth::{AuthConfig, AuthManager, ClientInfo, LoginRequest, SignupRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::new("a-jwt-secret-of-at-least-32-chars!!", "pepper-16-chars!");
//!     let auth = AuthManager::in_memory(&config);
//!
//!     auth.signup(SignupRequest {
//!         email: "player@example.com".to_string(),
//!         password: "SecurePass123".to_string(),
//!     })
//!     .await?;
//!
//!     let outcome = auth
//!         .login(
//!             LoginRequest {
//!                 email: "player@example.com".to_string(),
//!                 password: "SecurePass123".to_string(),
//!             },
//!             &ClientInfo::new("127.0.0.1", "docs"),
//!         )
//!         .await?;
//!     println!("2FA required: {}", outcome.requires_2fa());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod interim;
pub mod manager;
pub mod models;
pub mod password;
pub mod session;
pub mod totp;

pub use config::AuthConfig;
pub use errors::{AuthError, AuthResult, ErrorKind};
pub use interim::{INTERIM_TOKEN_ISSUER, InterimTokenIssuer};
pub use manager::{AuthManager, MIN_PASSWORD_LENGTH};
pub use models::{
    ClientInfo, LoginOutcome, LoginRequest, PasswordResetToken, RefreshToken, Session,
    SessionTokens, SignupRequest, TwoFactorClaims, TwoFactorLoginRequest, TwoFactorSetup, User,
    UserId, UserPatch,
};
pub use password::PasswordHasher;
pub use session::SessionManager;
pub use totp::{TotpEngine, TotpEnrollment};
