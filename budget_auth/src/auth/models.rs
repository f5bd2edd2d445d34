//! Authentication data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User ID type
pub type UserId = Uuid;

/// User model
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub two_factor_enabled: bool,
    /// Pending or active TOTP secret, `None` when 2FA is off and not enrolling
    #[serde(skip_serializing)]
    pub two_factor_secret: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Typed partial update for a user record.
///
/// Only the 2FA fields are mutable through this subsystem. `None` leaves a
/// field untouched; `two_factor_secret: Some(None)` clears the secret.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub two_factor_enabled: Option<bool>,
    pub two_factor_secret: Option<Option<String>>,
}

impl UserPatch {
    /// Store a freshly generated secret while keeping 2FA disabled
    pub fn pending_two_factor(secret: String) -> Self {
        Self {
            two_factor_enabled: Some(false),
            two_factor_secret: Some(Some(secret)),
        }
    }

    /// Complete enrollment
    pub fn enable_two_factor() -> Self {
        Self {
            two_factor_enabled: Some(true),
            two_factor_secret: None,
        }
    }

    /// Turn 2FA off and forget the secret
    pub fn disable_two_factor() -> Self {
        Self {
            two_factor_enabled: Some(false),
            two_factor_secret: Some(None),
        }
    }

    /// Apply the patch to an in-memory user
    pub fn apply(&self, user: &mut User) {
        if let Some(enabled) = self.two_factor_enabled {
            user.two_factor_enabled = enabled;
        }
        if let Some(secret) = &self.two_factor_secret {
            user.two_factor_secret = secret.clone();
        }
    }
}

/// Session model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: Uuid,
    pub user_id: UserId,
    pub token: Uuid,
    pub ip_address: String,
    pub user_agent: String,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// A session authenticates iff it is not revoked and not expired
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// Refresh token model, minted alongside exactly one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: UserId,
    pub session_id: Uuid,
    pub token: Uuid,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Usable iff not revoked and not expired
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// Password reset token.
///
/// Part of the stored data model; no flow in this crate issues or consumes it.
#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

/// Where a login came from
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: String,
    pub user_agent: String,
}

impl ClientInfo {
    pub fn new(ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            user_agent: user_agent.into(),
        }
    }
}

/// Signup request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Second step of a 2FA login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFactorLoginRequest {
    pub email: String,
    pub code: String,
    pub token: String,
}

/// Session tokens handed to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub session: Uuid,
    pub refresh: Uuid,
    pub user_id: UserId,
}

impl SessionTokens {
    pub fn from_pair(session: &Session, refresh: &RefreshToken) -> Self {
        Self {
            session: session.token,
            refresh: refresh.token,
            user_id: session.user_id,
        }
    }
}

/// Result of a first-factor login
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// 2FA is off, a session was issued
    Authenticated(SessionTokens),

    /// 2FA is on, only an interim token was issued
    TwoFactorRequired { token: String },
}

impl LoginOutcome {
    pub fn requires_2fa(&self) -> bool {
        matches!(self, LoginOutcome::TwoFactorRequired { .. })
    }
}

/// Claims of the interim token bridging password login and 2FA login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFactorClaims {
    pub user_id: UserId,
    pub email: String,
    pub is_2fa: bool,
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

/// Two-factor authentication setup response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFactorSetup {
    pub secret: String,
    pub otp_auth_url: String,
    pub issuer: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "carol@example.com".to_string(),
            password_hash: "hash".to_string(),
            two_factor_enabled: false,
            two_factor_secret: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_patch_lifecycle() {
        let mut user = user();

        UserPatch::pending_two_factor("SECRET".to_string()).apply(&mut user);
        assert!(!user.two_factor_enabled);
        assert_eq!(user.two_factor_secret.as_deref(), Some("SECRET"));

        UserPatch::enable_two_factor().apply(&mut user);
        assert!(user.two_factor_enabled);
        assert_eq!(user.two_factor_secret.as_deref(), Some("SECRET"));

        UserPatch::disable_two_factor().apply(&mut user);
        assert!(!user.two_factor_enabled);
        assert!(user.two_factor_secret.is_none());
    }

    #[test]
    fn test_session_validity() {
        let now = Utc::now();
        let mut session = Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token: Uuid::new_v4(),
            ip_address: "127.0.0.1".to_string(),
            user_agent: "test".to_string(),
            revoked: false,
            expires_at: now + Duration::minutes(15),
            created_at: now,
        };
        assert!(session.is_valid_at(now));
        assert!(!session.is_valid_at(now + Duration::minutes(16)));

        session.revoked = true;
        assert!(!session.is_valid_at(now));
    }

    #[test]
    fn test_user_serialization_hides_secrets() {
        let mut user = user();
        user.two_factor_secret = Some("JBSWY3DPEHPK3PXP".to_string());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("JBSWY3DPEHPK3PXP"));
        assert!(json.contains("carol@example.com"));
    }
}
