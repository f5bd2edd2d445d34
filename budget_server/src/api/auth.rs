//! Authentication API handlers.
//!
//! # Examples
//!
//! Register a new user:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/auth/signup \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "alice@example.com", "password": "password123"}'
//! ```
//!
//! Login:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "alice@example.com", "password": "password123"}'
//! ```

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use budget_auth::{
    AuthError,
    auth::{LoginOutcome, LoginRequest, SessionTokens, SignupRequest},
};
use serde::{Deserialize, Serialize};

use super::{ApiResponse, ApiResult, AppState, Client, middleware::AuthenticatedUser};
use crate::logging::log_security_event;

#[derive(Debug, Deserialize)]
pub struct RefreshTokensRequest {
    pub refresh_token: String,
}

/// Login result: either a session pair or the interim 2FA token
#[derive(Debug, Serialize)]
pub struct LoginData {
    pub requires_2fa: bool,
    #[serde(flatten)]
    pub session: Option<SessionTokens>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl From<LoginOutcome> for LoginData {
    fn from(outcome: LoginOutcome) -> Self {
        match outcome {
            LoginOutcome::Authenticated(tokens) => LoginData {
                requires_2fa: false,
                session: Some(tokens),
                token: None,
            },
            LoginOutcome::TwoFactorRequired { token } => LoginData {
                requires_2fa: true,
                session: None,
                token: Some(token),
            },
        }
    }
}

/// Register a new user account.
///
/// # Request Body
///
/// ```json
/// { "email": "alice@example.com", "password": "password123" }
/// ```
///
/// # Response
///
/// `201 Created` with `{"message": "User Created Successfully"}`. No session
/// is issued; the client logs in afterwards.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body, invalid email or short password
/// - `409 Conflict`: Email already registered (any casing)
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<()>>)> {
    let Json(request) = payload?;

    state.auth_manager.signup(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message("User Created Successfully")),
    ))
}

/// Authenticate with email and password.
///
/// # Response
///
/// Without 2FA:
/// ```json
/// { "message": "Login successful",
///   "data": { "requires_2fa": false, "session": "...", "refresh": "...", "user_id": "..." } }
/// ```
///
/// With 2FA enabled only an interim token is returned, to be exchanged at
/// `/auth/2fa/login`:
/// ```json
/// { "message": "2FA is enabled", "data": { "requires_2fa": true, "token": "eyJ..." } }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
/// - `429 Too Many Requests`: Too many failed attempts for this email
pub async fn login(
    State(state): State<AppState>,
    Client(client): Client,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<LoginData>>> {
    let Json(request) = payload?;

    match state.auth_manager.login(request, &client).await {
        Ok(outcome) => {
            let message = if outcome.requires_2fa() {
                "2FA is enabled"
            } else {
                "Login successful"
            };
            Ok(Json(ApiResponse::with_data(message, outcome.into())))
        }
        Err(err) => {
            match &err {
                AuthError::RateLimited => log_security_event(
                    "login_locked",
                    None,
                    Some(&client.ip_address),
                    "Login refused, too many failed attempts",
                ),
                AuthError::InvalidCredentials => log_security_event(
                    "failed_login",
                    None,
                    Some(&client.ip_address),
                    "Invalid email or password",
                ),
                _ => {}
            }
            Err(err.into())
        }
    }
}

/// Revoke the caller's session and every refresh token issued with it.
///
/// # Errors
///
/// - `401 Unauthorized`: Missing, unknown or already revoked session
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state
        .auth_manager
        .logout(&user.session_token.to_string())
        .await?;

    Ok(Json(ApiResponse::message("Logout successful")))
}

/// Trade a refresh token for a new session and refresh token.
///
/// # Request Body
///
/// ```json
/// { "refresh_token": "5b1c..." }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body or token
/// - `401 Unauthorized`: Unknown, expired, revoked or already used token
pub async fn refresh_token(
    State(state): State<AppState>,
    Client(client): Client,
    payload: Result<Json<RefreshTokensRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<SessionTokens>>> {
    let Json(request) = payload?;

    match state
        .auth_manager
        .refresh_token(&request.refresh_token, &client)
        .await
    {
        Ok(tokens) => Ok(Json(ApiResponse::with_data("Tokens refreshed", tokens))),
        Err(err) => {
            if matches!(err, AuthError::Unauthorized) {
                log_security_event(
                    "refresh_rejected",
                    None,
                    Some(&client.ip_address),
                    "Unusable refresh token presented",
                );
            }
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_login_data_shapes() {
        let tokens = SessionTokens {
            session: Uuid::new_v4(),
            refresh: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        };
        let body =
            serde_json::to_value(LoginData::from(LoginOutcome::Authenticated(tokens.clone())))
                .unwrap();
        assert_eq!(body["requires_2fa"], false);
        assert_eq!(body["session"], tokens.session.to_string());
        assert!(body.get("token").is_none());

        let body = serde_json::to_value(LoginData::from(LoginOutcome::TwoFactorRequired {
            token: "interim".to_string(),
        }))
        .unwrap();
        assert_eq!(body["requires_2fa"], true);
        assert_eq!(body["token"], "interim");
        assert!(body.get("session").is_none());
    }
}
