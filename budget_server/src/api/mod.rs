//! HTTP API for the authentication service.
//!
//! Thin axum layer over [`AuthManager`]: handlers parse JSON, pull client
//! metadata from the connection and hand everything to the manager.
//!
//! # Modules
//!
//! - [`auth`]: Signup, login, logout and token refresh
//! - [`two_factor`]: TOTP enrollment and the second login step
//! - [`middleware`]: Bearer session authentication and request logging
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                    - Health check (public)
//! POST /api/v1/auth/signup        - Register user (public)
//! POST /api/v1/auth/login         - Password login (public)
//! POST /api/v1/auth/refresh       - Rotate refresh token (public)
//! POST /api/v1/auth/2fa/login     - Second login step (public)
//! POST /api/v1/auth/logout        - Revoke session (auth required)
//! POST /api/v1/auth/2fa/setup     - Start 2FA enrollment (auth required)
//! POST /api/v1/auth/2fa/verify    - Confirm 2FA enrollment (auth required)
//! PUT  /api/v1/auth/2fa/disable   - Turn 2FA off (auth required)
//! ```
//!
//! Successful responses look like `{"message": "...", "data": {...}}`,
//! errors like `{"message": "..."}`.
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod auth;
pub mod middleware;
pub mod two_factor;

use axum::{
    Router,
    extract::{FromRequestParts, State, rejection::JsonRejection},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
};
use budget_auth::{
    AuthError, AuthManager, ErrorKind, auth::ClientInfo, db::Database,
    security::RedisCounterStore,
};
use serde::Serialize;
use serde_json::json;
use std::{
    convert::Infallible,
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// The backing stores are optional so the router can run on in-memory
/// stores; `/health` only probes the ones that are present.
#[derive(Clone)]
pub struct AppState {
    pub auth_manager: Arc<AuthManager>,
    pub database: Option<Database>,
    pub counters: Option<RedisCounterStore>,
}

impl AppState {
    /// State without external stores to probe
    pub fn new(auth_manager: Arc<AuthManager>) -> Self {
        Self {
            auth_manager,
            database: None,
            counters: None,
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use budget_server::api::{create_router, AppState};
/// # use std::net::SocketAddr;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router(state.clone());

    let root_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh_token))
        .route("/auth/2fa/login", post(two_factor::login_with_2fa));

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/2fa/setup", post(two_factor::setup))
        .route("/auth/2fa/verify", post(two_factor::verify))
        .route("/auth/2fa/disable", put(two_factor::disable))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}

/// Error returned by handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Body missing, not JSON, or missing fields
    #[error("Invalid Request")]
    InvalidRequest(#[from] JsonRejection),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => match err.kind() {
                ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
                ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Auth(err) => {
                if err.kind() == ErrorKind::Internal {
                    tracing::error!(error = %err, "Request failed");
                }
                err.client_message()
            }
            ApiError::InvalidRequest(rejection) => {
                tracing::debug!(reason = %rejection.body_text(), "Rejected request body");
                self.to_string()
            }
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Caller address and user agent, recorded on new sessions.
///
/// The address is the first `X-Forwarded-For` hop when it parses as an IP,
/// otherwise the peer address from `ConnectInfo`.
#[derive(Debug, Clone)]
pub struct Client(pub ClientInfo);

impl<S: Send + Sync> FromRequestParts<S> for Client {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|ip| ip.trim().parse::<IpAddr>().ok());

        let ip_address = forwarded
            .or_else(|| {
                parts
                    .extensions
                    .get::<axum::extract::ConnectInfo<SocketAddr>>()
                    .map(|info| info.0.ip())
            })
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let user_agent = parts
            .headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Ok(Client(ClientInfo::new(ip_address, user_agent)))
    }
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` if every configured store answers, or
/// `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","database":true,"redis":true,"timestamp":"2026-10-18T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match &state.database {
        Some(db) => db.health_check().await.is_ok(),
        None => true,
    };

    let redis_healthy = match &state.counters {
        Some(counters) => counters.health_check().await.is_ok(),
        None => true,
    };

    let overall_healthy = db_healthy && redis_healthy;

    let status_code = if overall_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if overall_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "redis": redis_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            ApiError::from(AuthError::EmailTaken).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(AuthError::RateLimited).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::Storage("down".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(AuthError::TwoFactorNotEnabled).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_message_envelope_omits_data() {
        let body = serde_json::to_value(ApiResponse::message("User Created Successfully")).unwrap();
        assert_eq!(body, json!({ "message": "User Created Successfully" }));

        let body = serde_json::to_value(ApiResponse::with_data("ok", json!({ "a": 1 }))).unwrap();
        assert_eq!(body["data"]["a"], 1);
    }

    async fn client_for(forwarded: Option<&str>, peer: Option<SocketAddr>) -> ClientInfo {
        let mut builder = axum::http::Request::builder().header("user-agent", "unit");
        if let Some(forwarded) = forwarded {
            builder = builder.header("x-forwarded-for", forwarded);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        if let Some(peer) = peer {
            parts.extensions.insert(axum::extract::ConnectInfo(peer));
        }
        let Client(client) = Client::from_request_parts(&mut parts, &()).await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_client_takes_first_forwarded_hop() {
        let client = client_for(Some(" 203.0.113.7 , 10.0.0.1"), None).await;
        assert_eq!(client.ip_address, "203.0.113.7");
        assert_eq!(client.user_agent, "unit");

        let client = client_for(Some("2001:db8::1"), None).await;
        assert_eq!(client.ip_address, "2001:db8::1");
    }

    #[tokio::test]
    async fn test_client_ignores_unparseable_forwarded_header() {
        let peer: SocketAddr = "192.0.2.10:5000".parse().unwrap();
        let garbage = "x".repeat(100);

        let client = client_for(Some(&garbage), Some(peer)).await;
        assert_eq!(client.ip_address, "192.0.2.10");

        let client = client_for(Some("not-an-ip, 10.0.0.1"), None).await;
        assert_eq!(client.ip_address, "unknown");
    }
}
