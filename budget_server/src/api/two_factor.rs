//! Two-factor authentication handlers.
//!
//! Enrollment is two steps: `POST /auth/2fa/setup` stores a pending secret
//! and returns it with an `otpauth://` URI, then `POST /auth/2fa/verify` with
//! a current code turns 2FA on.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use budget_auth::{
    AuthError,
    auth::{SessionTokens, TwoFactorLoginRequest, TwoFactorSetup},
};
use serde::Deserialize;

use super::{ApiResponse, ApiResult, AppState, Client, middleware::AuthenticatedUser};
use crate::logging::log_security_event;

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub code: String,
}

/// Start 2FA enrollment for the caller.
///
/// # Errors
///
/// - `400 Bad Request`: 2FA already enabled
pub async fn setup(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<ApiResponse<TwoFactorSetup>>> {
    let setup = state.auth_manager.generate_2fa(user.user_id).await?;

    Ok(Json(ApiResponse::with_data("2FA secret generated", setup)))
}

/// Confirm enrollment with a code from the authenticator app.
///
/// # Errors
///
/// - `400 Bad Request`: Missing code
/// - `401 Unauthorized`: Wrong code or no pending secret
pub async fn verify(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<VerifyCodeRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let Json(request) = payload?;

    state
        .auth_manager
        .verify_2fa(user.user_id, &request.code)
        .await?;

    Ok(Json(ApiResponse::message("2FA enabled successfully")))
}

/// Turn 2FA off for the caller.
///
/// # Errors
///
/// - `400 Bad Request`: 2FA not enabled
pub async fn disable(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.auth_manager.disable_2fa(user.user_id).await?;

    Ok(Json(ApiResponse::message("2FA disabled successfully")))
}

/// Second login step: exchange the interim token and a code for a session.
///
/// # Request Body
///
/// ```json
/// { "email": "alice@example.com", "code": "123456", "token": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields
/// - `401 Unauthorized`: Bad or expired token, email mismatch or wrong code
pub async fn login_with_2fa(
    State(state): State<AppState>,
    Client(client): Client,
    payload: Result<Json<TwoFactorLoginRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<SessionTokens>>> {
    let Json(request) = payload?;

    match state.auth_manager.login_with_2fa(request, &client).await {
        Ok(tokens) => Ok(Json(ApiResponse::with_data("Login successful", tokens))),
        Err(err) => {
            if matches!(err, AuthError::Unauthorized) {
                log_security_event(
                    "two_factor_failed",
                    None,
                    Some(&client.ip_address),
                    "Second login step rejected",
                );
            }
            Err(err.into())
        }
    }
}
