//! Authentication middleware for protected endpoints.
//!
//! The middleware extracts the session token from the Authorization header,
//! resolves it through [`AuthManager::authenticate`](budget_auth::AuthManager::authenticate)
//! and injects an [`AuthenticatedUser`] into request extensions for downstream handlers.
//!
//! # Extracting the user
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use budget_server::api::middleware::AuthenticatedUser;
//!
//! async fn protected_handler(Extension(user): Extension<AuthenticatedUser>) -> String {
//!     format!("Authenticated as user {}", user.user_id)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use budget_auth::{ErrorKind, auth::UserId};
use serde_json::json;
use std::time::Instant;
use uuid::Uuid;

use super::{ApiError, AppState};
use crate::logging;

/// Caller of a protected route
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub session_id: Uuid,
    pub session_token: Uuid,
}

/// Session token from an Authorization header value, with or without the `Bearer ` prefix
pub fn bearer_token(header: &str) -> &str {
    header.strip_prefix("Bearer ").unwrap_or(header).trim()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized" })),
    )
        .into_response()
}

/// Authentication middleware that validates session tokens and injects the user.
///
/// Expects:
/// ```text
/// Authorization: Bearer 3f0c9a1e-...
/// ```
///
/// - **Success**: Session live → injects [`AuthenticatedUser`] → calls next handler
/// - **Missing header / malformed / unknown / revoked / expired**: `401 Unauthorized`
/// - **Store failure**: `500 Internal Server Error`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| bearer_token(value).to_string());

    let Some(token) = token else {
        return unauthorized();
    };

    match state.auth_manager.authenticate(&token).await {
        Ok(session) => {
            request.extensions_mut().insert(AuthenticatedUser {
                user_id: session.user_id,
                session_id: session.id,
                session_token: session.token,
            });
            next.run(request).await
        }
        Err(err) if err.kind() == ErrorKind::Internal => ApiError::from(err).into_response(),
        Err(_) => unauthorized(),
    }
}

/// Log method, path, status and latency of every request
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    logging::log_api_request(
        method.as_str(),
        &path,
        response.status().as_u16(),
        started.elapsed().as_millis() as u64,
    );
    response
}
