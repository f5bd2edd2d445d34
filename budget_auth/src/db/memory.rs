//! In-memory repositories for tests and local development.
//!
//! Each store serialises access through one async lock, which gives the same
//! check-then-write atomicity the PostgreSQL implementations get from
//! conditional updates.

use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repository::{RefreshTokenRepository, SessionRepository, UserRepository};
use crate::auth::{AuthError, AuthResult, RefreshToken, Session, User, UserId, UserPatch};

/// In-memory `UserRepository`
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let wanted = email.trim().to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.to_lowercase() == wanted)
            .cloned())
    }

    async fn get_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        let mut users = self.users.write().await;
        let email = user.email.to_lowercase();
        if users.values().any(|u| u.email.to_lowercase() == email) {
            return Err(AuthError::EmailTaken);
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user_id: UserId, patch: &UserPatch) -> AuthResult<()> {
        if let Some(user) = self.users.write().await.get_mut(&user_id) {
            patch.apply(user);
        }
        Ok(())
    }
}

/// In-memory `SessionRepository`
#[derive(Clone, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored session including revoked ones
    pub async fn all(&self) -> Vec<Session> {
        self.sessions.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create(&self, session: &Session) -> AuthResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn get_by_token(&self, token: Uuid) -> AuthResult<Option<Session>> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .find(|s| s.token == token && !s.revoked)
            .cloned())
    }

    async fn set_revoked(&self, session_id: Uuid) -> AuthResult<()> {
        if let Some(session) = self.sessions.write().await.get_mut(&session_id) {
            session.revoked = true;
        }
        Ok(())
    }

    async fn delete(&self, session_id: Uuid) -> AuthResult<()> {
        self.sessions.write().await.remove(&session_id);
        Ok(())
    }
}

/// In-memory `RefreshTokenRepository`
#[derive(Clone, Default)]
pub struct InMemoryRefreshTokenRepository {
    tokens: Arc<RwLock<HashMap<Uuid, RefreshToken>>>,
}

impl InMemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every token minted alongside `session_id`
    pub async fn for_session(&self, session_id: Uuid) -> Vec<RefreshToken> {
        self.tokens
            .read()
            .await
            .values()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        self.tokens.write().await.insert(token.id, token.clone());
        Ok(())
    }

    async fn get_by_token(&self, token: Uuid) -> AuthResult<Option<RefreshToken>> {
        Ok(self
            .tokens
            .read()
            .await
            .values()
            .find(|t| t.token == token)
            .cloned())
    }

    async fn set_revoked(&self, token_id: Uuid) -> AuthResult<bool> {
        match self.tokens.write().await.get_mut(&token_id) {
            Some(token) if !token.revoked => {
                token.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_revoked_by_session_id(&self, session_id: Uuid) -> AuthResult<u64> {
        let mut touched = 0;
        for token in self
            .tokens
            .write()
            .await
            .values_mut()
            .filter(|t| t.session_id == session_id)
        {
            token.revoked = true;
            touched += 1;
        }
        Ok(touched)
    }
}
