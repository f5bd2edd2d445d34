//! Repository trait definitions for testability and dependency injection.
//!
//! This module provides trait-based abstractions over the user, session and
//! refresh-token tables, with PostgreSQL implementations. In-memory
//! implementations live in [`super::memory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::auth::{AuthError, AuthResult, RefreshToken, Session, User, UserId, UserPatch};

/// PostgreSQL error code for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";

/// Trait for user repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by email, case-insensitively
    async fn get_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Find user by ID
    async fn get_by_id(&self, user_id: UserId) -> AuthResult<Option<User>>;

    /// Insert a new user; a duplicate email yields [`AuthError::EmailTaken`]
    async fn create(&self, user: &User) -> AuthResult<()>;

    /// Apply a typed partial update
    async fn update(&self, user_id: UserId, patch: &UserPatch) -> AuthResult<()>;
}

/// Trait for session repository operations
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session
    async fn create(&self, session: &Session) -> AuthResult<()>;

    /// Find a non-revoked session by its token
    async fn get_by_token(&self, token: Uuid) -> AuthResult<Option<Session>>;

    /// Mark a session revoked (idempotent)
    async fn set_revoked(&self, session_id: Uuid) -> AuthResult<()>;

    /// Physically remove a session; only used to undo a half-created pair
    async fn delete(&self, session_id: Uuid) -> AuthResult<()>;
}

/// Trait for refresh token repository operations
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Persist a new refresh token
    async fn create(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Find a refresh token by value, revoked or not
    async fn get_by_token(&self, token: Uuid) -> AuthResult<Option<RefreshToken>>;

    /// Revoke one token.
    ///
    /// Returns `true` only for the call that moved the row from active to
    /// revoked, so concurrent rotations of the same token have one winner.
    async fn set_revoked(&self, token_id: Uuid) -> AuthResult<bool>;

    /// Revoke every token minted alongside `session_id`; returns rows touched
    async fn set_revoked_by_session_id(&self, session_id: Uuid) -> AuthResult<u64>;
}

/// Default PostgreSQL implementation of `UserRepository`
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(r: &PgRow) -> User {
    User {
        id: r.get("id"),
        email: r.get("email"),
        password_hash: r.get("password_hash"),
        two_factor_enabled: r.get("two_factor_enabled"),
        two_factor_secret: r.get("two_factor_secret"),
        created_at: r.get::<DateTime<Utc>, _>("created_at"),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, two_factor_enabled, two_factor_secret, created_at
             FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn get_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, two_factor_enabled, two_factor_secret, created_at
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, two_factor_enabled, two_factor_secret, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.two_factor_enabled)
        .bind(&user.two_factor_secret)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(AuthError::EmailTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, user_id: UserId, patch: &UserPatch) -> AuthResult<()> {
        // COALESCE keeps columns the patch leaves alone
        sqlx::query(
            r#"
            UPDATE users SET
                two_factor_enabled = COALESCE($2, two_factor_enabled),
                two_factor_secret = CASE WHEN $3 THEN $4 ELSE two_factor_secret END
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(patch.two_factor_enabled)
        .bind(patch.two_factor_secret.is_some())
        .bind(patch.two_factor_secret.clone().flatten())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Default PostgreSQL implementation of `SessionRepository`
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, session: &Session) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, token, ip_address, user_agent, revoked, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.token)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.revoked)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_token(&self, token: Uuid) -> AuthResult<Option<Session>> {
        let row = sqlx::query(
            "SELECT id, user_id, token, ip_address, user_agent, revoked, expires_at, created_at
             FROM sessions WHERE token = $1 AND revoked = FALSE",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Session {
            id: r.get("id"),
            user_id: r.get("user_id"),
            token: r.get("token"),
            ip_address: r.get("ip_address"),
            user_agent: r.get("user_agent"),
            revoked: r.get("revoked"),
            expires_at: r.get("expires_at"),
            created_at: r.get("created_at"),
        }))
    }

    async fn set_revoked(&self, session_id: Uuid) -> AuthResult<()> {
        sqlx::query("UPDATE sessions SET revoked = TRUE WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, session_id: Uuid) -> AuthResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Default PostgreSQL implementation of `RefreshTokenRepository`
pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PgRefreshTokenRepository {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, session_id, token, revoked, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(token.session_id)
        .bind(token.token)
        .bind(token.revoked)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_token(&self, token: Uuid) -> AuthResult<Option<RefreshToken>> {
        let row = sqlx::query(
            "SELECT id, user_id, session_id, token, revoked, expires_at, created_at
             FROM refresh_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| RefreshToken {
            id: r.get("id"),
            user_id: r.get("user_id"),
            session_id: r.get("session_id"),
            token: r.get("token"),
            revoked: r.get("revoked"),
            expires_at: r.get("expires_at"),
            created_at: r.get("created_at"),
        }))
    }

    async fn set_revoked(&self, token_id: Uuid) -> AuthResult<bool> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1 AND revoked = FALSE")
                .bind(token_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_revoked_by_session_id(&self, session_id: Uuid) -> AuthResult<u64> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
