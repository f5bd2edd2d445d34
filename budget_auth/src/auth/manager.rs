//! Authentication manager implementation.

use super::{
    config::AuthConfig,
    errors::{AuthError, AuthResult},
    interim::InterimTokenIssuer,
    models::{
        ClientInfo, LoginOutcome, LoginRequest, Session, SessionTokens, SignupRequest,
        TwoFactorLoginRequest, TwoFactorSetup, User, UserId, UserPatch,
    },
    password::PasswordHasher,
    session::SessionManager,
    totp::TotpEngine,
};
use crate::{
    db::{
        InMemoryRefreshTokenRepository, InMemorySessionRepository, InMemoryUserRepository,
        RefreshTokenRepository, SessionRepository, UserRepository,
    },
    security::{CounterStore, InMemoryCounterStore, RateLimitResult, RateLimiter},
};
use chrono::Utc;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Minimum password length accepted at signup
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum email length, matching the `users.email` column
const MAX_EMAIL_LENGTH: usize = 255;

/// Authentication manager
///
/// Owns every authentication component and drives the flows:
/// `signup`, `login` (password, then optionally `login_with_2fa`),
/// 2FA enrollment, `logout`, `refresh_token` and `authenticate` for
/// protected routes.
#[derive(Clone)]
pub struct AuthManager {
    users: Arc<dyn UserRepository>,
    sessions: SessionManager,
    rate_limiter: RateLimiter,
    hasher: PasswordHasher,
    totp: TotpEngine,
    interim: InterimTokenIssuer,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `users` - User store
    /// * `sessions` - Session store
    /// * `refresh_tokens` - Refresh token store
    /// * `counters` - Shared counter store for login throttling
    /// * `config` - Secrets and lifetimes
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        counters: Arc<dyn CounterStore>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            users,
            sessions: SessionManager::new(
                sessions,
                refresh_tokens,
                config.session_ttl(),
                config.refresh_ttl(),
            ),
            rate_limiter: RateLimiter::new(counters, config.login_rate_limit.clone()),
            hasher: PasswordHasher::new(config.password_pepper.clone()),
            totp: TotpEngine::new(config.totp_issuer.clone()),
            interim: InterimTokenIssuer::new(&config.jwt_secret, config.interim_ttl()),
        }
    }

    /// Manager backed entirely by in-memory stores
    pub fn in_memory(config: &AuthConfig) -> Self {
        Self::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemorySessionRepository::new()),
            Arc::new(InMemoryRefreshTokenRepository::new()),
            Arc::new(InMemoryCounterStore::new()),
            config,
        )
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn totp(&self) -> &TotpEngine {
        &self.totp
    }

    /// Register a new user
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidInput` - Malformed email or short password
    /// * `AuthError::EmailTaken` - Email already registered (any casing)
    pub async fn signup(&self, request: SignupRequest) -> AuthResult<User> {
        let email = validate_email(&request.email)?;
        validate_password(&request.password)?;

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash: self.hasher.hash(&request.password)?,
            two_factor_enabled: false,
            two_factor_secret: None,
            created_at: Utc::now(),
        };

        self.users.create(&user).await?;
        log::info!("User {} signed up", user.id);

        Ok(user)
    }

    /// Password login
    ///
    /// A locked identity is refused before the password is looked at. Unknown
    /// emails and wrong passwords count against the same limiter and produce
    /// the same error.
    ///
    /// # Errors
    ///
    /// * `AuthError::RateLimited` - Identity locked, or this failure locked it
    /// * `AuthError::InvalidCredentials` - Unknown email or wrong password
    pub async fn login(&self, request: LoginRequest, client: &ClientInfo) -> AuthResult<LoginOutcome> {
        let email = validate_email(&request.email)?;
        if request.password.is_empty() {
            return Err(AuthError::InvalidInput("Password is required".to_string()));
        }

        if self.rate_limiter.is_locked(&email).await? {
            log::warn!("Login refused for locked identity from {}", client.ip_address);
            return Err(AuthError::RateLimited);
        }

        let Some(user) = self.users.get_by_email(&email).await? else {
            // Same Argon2 work as a wrong password
            self.hasher.verify_dummy(&request.password);
            return Err(self.reject_login(&email).await);
        };

        if !self.hasher.verify(&request.password, &user.password_hash) {
            log::warn!("Wrong password for user {} from {}", user.id, client.ip_address);
            return Err(self.reject_login(&email).await);
        }

        self.rate_limiter.reset(&email).await?;

        if user.two_factor_enabled {
            let token = self.interim.issue(&user)?;
            log::debug!("User {} passed first factor, awaiting 2FA", user.id);
            return Ok(LoginOutcome::TwoFactorRequired { token });
        }

        let tokens = self.issue_session(user.id, client).await?;
        log::info!("User {} logged in", user.id);
        Ok(LoginOutcome::Authenticated(tokens))
    }

    /// Count a failed login and pick the error to report
    async fn reject_login(&self, email: &str) -> AuthError {
        match self.rate_limiter.record_failure(email).await {
            Ok(RateLimitResult::Locked { .. }) => AuthError::RateLimited,
            Ok(RateLimitResult::Allowed { .. }) => AuthError::InvalidCredentials,
            Err(e) => e.into(),
        }
    }

    /// Second login step for users with 2FA enabled
    ///
    /// Token, email and code problems all surface as `AuthError::Unauthorized`.
    pub async fn login_with_2fa(
        &self,
        request: TwoFactorLoginRequest,
        client: &ClientInfo,
    ) -> AuthResult<SessionTokens> {
        let email = validate_email(&request.email)?;
        if request.code.trim().is_empty() || request.token.trim().is_empty() {
            return Err(AuthError::InvalidInput(
                "Code and token are required".to_string(),
            ));
        }

        let claims = self.interim.verify(request.token.trim())?;

        let claimed = claims.email.trim().to_lowercase();
        if !bool::from(claimed.as_bytes().ct_eq(email.to_lowercase().as_bytes())) {
            log::warn!("Interim token presented with a different email");
            return Err(AuthError::Unauthorized);
        }

        let user = self
            .users
            .get_by_email(&claims.email)
            .await?
            .filter(|u| u.id == claims.user_id)
            .ok_or(AuthError::Unauthorized)?;

        let secret = match (&user.two_factor_secret, user.two_factor_enabled) {
            (Some(secret), true) => secret,
            _ => return Err(AuthError::Unauthorized),
        };

        if !self.totp.validate(&request.code, secret) {
            log::warn!("Invalid 2FA code for user {}", user.id);
            return Err(AuthError::Unauthorized);
        }

        let tokens = self.issue_session(user.id, client).await?;
        log::info!("User {} logged in with 2FA", user.id);
        Ok(tokens)
    }

    /// Start 2FA enrollment: store a pending secret, leave 2FA disabled
    ///
    /// # Errors
    ///
    /// * `AuthError::TwoFactorAlreadyEnabled` - 2FA already on
    pub async fn generate_2fa(&self, user_id: UserId) -> AuthResult<TwoFactorSetup> {
        let user = self.load_user(user_id).await?;

        if user.two_factor_enabled {
            return Err(AuthError::TwoFactorAlreadyEnabled);
        }

        let enrollment = self.totp.generate_secret(&user.email)?;
        self.users
            .update(
                user.id,
                &UserPatch::pending_two_factor(enrollment.secret.clone()),
            )
            .await?;

        Ok(TwoFactorSetup {
            secret: enrollment.secret,
            otp_auth_url: enrollment.otpauth_url,
            issuer: enrollment.issuer,
            email: user.email,
        })
    }

    /// Confirm enrollment with a code from the pending secret
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidTwoFactorCode` - Wrong code or no pending secret
    pub async fn verify_2fa(&self, user_id: UserId, code: &str) -> AuthResult<()> {
        if code.trim().is_empty() {
            return Err(AuthError::InvalidInput("Code is required".to_string()));
        }

        let user = self.load_user(user_id).await?;
        let secret = user.two_factor_secret.as_deref().unwrap_or_default();

        if !self.totp.validate(code, secret) {
            return Err(AuthError::InvalidTwoFactorCode);
        }

        self.users
            .update(user.id, &UserPatch::enable_two_factor())
            .await?;
        log::info!("User {} enabled 2FA", user.id);
        Ok(())
    }

    /// Turn 2FA off and forget the secret
    ///
    /// # Errors
    ///
    /// * `AuthError::TwoFactorNotEnabled` - 2FA already off
    pub async fn disable_2fa(&self, user_id: UserId) -> AuthResult<()> {
        let user = self.load_user(user_id).await?;

        if !user.two_factor_enabled {
            return Err(AuthError::TwoFactorNotEnabled);
        }

        self.users
            .update(user.id, &UserPatch::disable_two_factor())
            .await?;
        log::info!("User {} disabled 2FA", user.id);
        Ok(())
    }

    /// Revoke the session behind `session_token` and all of its refresh tokens
    ///
    /// Refresh tokens go first: the session stays findable until the cascade
    /// has succeeded, so a failed logout can be retried.
    pub async fn logout(&self, session_token: &str) -> AuthResult<()> {
        let token = parse_token(session_token).ok_or(AuthError::Unauthorized)?;

        let session = self
            .sessions
            .get_by_token(token)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        self.sessions
            .revoke_refresh_tokens_for_session(session.id)
            .await?;
        self.sessions.revoke(session.id).await?;

        log::info!("User {} logged out", session.user_id);
        Ok(())
    }

    /// Trade a refresh token for a new session/refresh pair
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidInput` - Not a token
    /// * `AuthError::Unauthorized` - Unknown, expired, revoked or already used
    pub async fn refresh_token(&self, refresh_token: &str, client: &ClientInfo) -> AuthResult<SessionTokens> {
        let token = parse_token(refresh_token)
            .ok_or_else(|| AuthError::InvalidInput("Invalid refresh token".to_string()))?;

        let (session, refresh) = self.sessions.rotate_refresh_token(token, client).await?;
        Ok(SessionTokens::from_pair(&session, &refresh))
    }

    /// Resolve a bearer session token for a protected request
    pub async fn authenticate(&self, session_token: &str) -> AuthResult<Session> {
        let token = parse_token(session_token).ok_or(AuthError::Unauthorized)?;

        self.sessions
            .validate(token)
            .await?
            .ok_or(AuthError::Unauthorized)
    }

    async fn issue_session(&self, user_id: UserId, client: &ClientInfo) -> AuthResult<SessionTokens> {
        let (session, refresh) = self
            .sessions
            .create_session_and_refresh_token(user_id, client)
            .await?;
        Ok(SessionTokens::from_pair(&session, &refresh))
    }

    /// Users behind an authenticated session that no longer exist are unauthorized
    async fn load_user(&self, user_id: UserId) -> AuthResult<User> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::Unauthorized)
    }
}

fn parse_token(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

/// Trim and sanity-check an email address
fn validate_email(email: &str) -> AuthResult<String> {
    let email = email.trim();
    let invalid = || AuthError::InvalidInput("A valid email is required".to_string());

    // A colon cannot appear in the authenticator label built from the email
    if email.is_empty()
        || email.len() > MAX_EMAIL_LENGTH
        || email.chars().any(|c| c.is_whitespace() || c == ':')
    {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }

    Ok(email.to_string())
}

fn validate_password(password: &str) -> AuthResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}
