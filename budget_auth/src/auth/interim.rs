//! Short-lived signed token bridging password login and 2FA login.

use super::{
    errors::{AuthError, AuthResult},
    models::{TwoFactorClaims, User},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

/// `iss` claim of every interim token
pub const INTERIM_TOKEN_ISSUER: &str = "budget_max";

/// Issues and verifies interim 2FA tokens (HS256)
#[derive(Clone)]
pub struct InterimTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl InterimTokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Sign a "first factor passed, second factor pending" claim for `user`
    pub fn issue(&self, user: &User) -> AuthResult<String> {
        let now = Utc::now();
        let claims = TwoFactorClaims {
            user_id: user.id,
            email: user.email.clone(),
            is_2fa: true,
            iss: INTERIM_TOKEN_ISSUER.to_string(),
            sub: user.email.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Verify signature, expiry and the 2FA marker
    ///
    /// Every failure collapses to [`AuthError::Unauthorized`].
    pub fn verify(&self, token: &str) -> AuthResult<TwoFactorClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[INTERIM_TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_nbf = true;

        let claims = decode::<TwoFactorClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                log::debug!("Interim token rejected: {}", e);
                AuthError::Unauthorized
            })?
            .claims;

        // The library applies leeway; expiry is re-checked without it
        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Unauthorized);
        }

        if !claims.is_2fa {
            return Err(AuthError::Unauthorized);
        }

        Ok(claims)
    }
}
