//! Session and refresh-token lifecycle.

use super::{
    errors::{AuthError, AuthResult},
    models::{ClientInfo, RefreshToken, Session, UserId},
};
use crate::db::{RefreshTokenRepository, SessionRepository};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Creates, looks up, rotates and revokes session/refresh-token pairs
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<dyn SessionRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    session_ttl: Duration,
    refresh_ttl: Duration,
}

impl SessionManager {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        session_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            sessions,
            refresh_tokens,
            session_ttl,
            refresh_ttl,
        }
    }

    /// Mint and persist a session together with its refresh token
    ///
    /// If the refresh token cannot be stored the session is deleted again and
    /// the whole operation fails.
    pub async fn create_session_and_refresh_token(
        &self,
        user_id: UserId,
        client: &ClientInfo,
    ) -> AuthResult<(Session, RefreshToken)> {
        let now = Utc::now();

        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            token: Uuid::new_v4(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            revoked: false,
            expires_at: now + self.session_ttl,
            created_at: now,
        };

        let refresh = RefreshToken {
            id: Uuid::new_v4(),
            user_id,
            session_id: session.id,
            token: Uuid::new_v4(),
            revoked: false,
            expires_at: now + self.refresh_ttl,
            created_at: now,
        };

        self.sessions.create(&session).await?;

        if let Err(e) = self.refresh_tokens.create(&refresh).await {
            log::error!(
                "Failed to store refresh token for session {}: {}",
                session.id,
                e
            );
            if let Err(cleanup) = self.sessions.delete(session.id).await {
                log::error!("Failed to remove orphaned session {}: {}", session.id, cleanup);
            }
            return Err(e);
        }

        Ok((session, refresh))
    }

    /// Non-revoked session for `token`; revoked sessions look like missing ones
    pub async fn get_by_token(&self, token: Uuid) -> AuthResult<Option<Session>> {
        self.sessions.get_by_token(token).await
    }

    /// Session for `token` if it can still authenticate requests
    pub async fn validate(&self, token: Uuid) -> AuthResult<Option<Session>> {
        let now = Utc::now();
        Ok(self
            .sessions
            .get_by_token(token)
            .await?
            .filter(|s| s.is_valid_at(now)))
    }

    pub async fn revoke(&self, session_id: Uuid) -> AuthResult<()> {
        self.sessions.set_revoked(session_id).await
    }

    pub async fn revoke_refresh_tokens_for_session(&self, session_id: Uuid) -> AuthResult<()> {
        let revoked = self
            .refresh_tokens
            .set_revoked_by_session_id(session_id)
            .await?;
        log::debug!("Revoked {} refresh token(s) for session {}", revoked, session_id);
        Ok(())
    }

    /// Exchange a refresh token for a brand-new pair
    ///
    /// The old token is revoked with a conditional update before anything is
    /// minted, so each refresh token yields at most one new pair.
    pub async fn rotate_refresh_token(
        &self,
        old_token: Uuid,
        client: &ClientInfo,
    ) -> AuthResult<(Session, RefreshToken)> {
        let token = self
            .refresh_tokens
            .get_by_token(old_token)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        if !token.is_usable_at(Utc::now()) {
            return Err(AuthError::Unauthorized);
        }

        if !self.refresh_tokens.set_revoked(token.id).await? {
            log::warn!("Refresh token {} was already used", token.id);
            return Err(AuthError::Unauthorized);
        }

        self.create_session_and_refresh_token(token.user_id, client)
            .await
    }
}
