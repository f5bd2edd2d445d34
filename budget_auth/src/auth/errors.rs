//! Authentication error types.

use thiserror::Error;

/// Status class of an authentication error.
///
/// The HTTP layer maps each class onto one status code; the library itself
/// stays transport agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input (400)
    BadRequest,
    /// Bad credentials or invalid token/session/code (401)
    Unauthorized,
    /// Duplicate resource (409)
    Conflict,
    /// Login lockout (429)
    TooManyRequests,
    /// Persistence, signing or hashing failure (500)
    Internal,
}

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Non-SQL storage backend error (counter store, in-memory fakes)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Interim token could not be signed
    #[error("Token signing failed: {0}")]
    TokenSigning(#[from] jsonwebtoken::errors::Error),

    /// TOTP secret generation failed
    #[error("Two-factor secret generation failed: {0}")]
    TotpGeneration(String),

    /// Invalid request input
    #[error("Invalid request: {0}")]
    InvalidInput(String),

    /// Unknown email or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Invalid, expired or revoked session, refresh token or interim token
    #[error("Unauthorized")]
    Unauthorized,

    /// Invalid 2FA code during enrollment
    #[error("Invalid two-factor authentication code")]
    InvalidTwoFactorCode,

    /// Email already registered
    #[error("User with this email already exists")]
    EmailTaken,

    /// 2FA setup requested while already enabled
    #[error("Two-factor authentication is already enabled")]
    TwoFactorAlreadyEnabled,

    /// 2FA disable requested while not enabled
    #[error("Two-factor authentication is not enabled")]
    TwoFactorNotEnabled,

    /// Login locked after too many failures
    #[error("Too many login attempts, please try again later")]
    RateLimited,
}

impl AuthError {
    /// Status class for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidInput(_)
            | AuthError::TwoFactorAlreadyEnabled
            | AuthError::TwoFactorNotEnabled => ErrorKind::BadRequest,
            AuthError::InvalidCredentials
            | AuthError::Unauthorized
            | AuthError::InvalidTwoFactorCode => ErrorKind::Unauthorized,
            AuthError::EmailTaken => ErrorKind::Conflict,
            AuthError::RateLimited => ErrorKind::TooManyRequests,
            AuthError::Database(_)
            | AuthError::Storage(_)
            | AuthError::HashingFailed
            | AuthError::TokenSigning(_)
            | AuthError::TotpGeneration(_) => ErrorKind::Internal,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Internal errors keep their source for server-side logging only.
    pub fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_errors_are_sanitized() {
        let err = AuthError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.client_message(), "Internal server error");

        let err = AuthError::Storage("redis: connection refused".to_string());
        assert!(!err.client_message().contains("redis"));
    }

    #[test]
    fn test_credential_failures_share_one_message() {
        let err = AuthError::InvalidCredentials;
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.client_message(), "Invalid email or password");
    }

    #[test]
    fn test_status_classes() {
        assert_eq!(AuthError::EmailTaken.kind(), ErrorKind::Conflict);
        assert_eq!(AuthError::RateLimited.kind(), ErrorKind::TooManyRequests);
        assert_eq!(
            AuthError::InvalidInput("email".to_string()).kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(
            AuthError::TwoFactorAlreadyEnabled.kind(),
            ErrorKind::BadRequest
        );
    }
}
