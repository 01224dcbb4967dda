//! HTTP surface over [`AuthService`].
//!
//! Every failure leaves as one of a handful of generic messages; the
//! internal variant is logged and never echoed to the client.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, IssuedToken, TokenPair};
use crate::error::{AuthError, ErrorClass};
use crate::types::{Credential, NewUser, UserProfile};

/// Build the router.
pub fn router(service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .with_state(service)
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    bucket_id: Option<String>,
}

#[derive(Deserialize)]
struct LoginRequest {
    identifier: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Deserialize)]
struct LogoutRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    token_type: &'static str,
    /// Seconds until the access token expires.
    expires_in: u64,
    /// Seconds until the refresh token expires.
    refresh_expires_in: u64,
}

const fn lifetime(token: &IssuedToken) -> u64 {
    token.expires_at.saturating_sub(token.issued_at)
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            expires_in: lifetime(&pair.access),
            refresh_expires_in: lifetime(&pair.refresh),
            access_token: pair.access.token,
            refresh_token: pair.refresh.token,
            token_type: "Bearer",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

/// Error returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    /// The request body could not be parsed.
    BadRequest(String),
    /// A handler task failed to complete.
    Internal(String),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self::Auth(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Auth(e) => {
                let status = match e.class() {
                    ErrorClass::Credentials | ErrorClass::Token => StatusCode::UNAUTHORIZED,
                    ErrorClass::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                    ErrorClass::Conflict => StatusCode::CONFLICT,
                    ErrorClass::InvalidRequest => StatusCode::BAD_REQUEST,
                };
                if status.is_server_error() {
                    tracing::warn!(kind = e.kind(), "request failed: {e}");
                } else {
                    tracing::debug!(kind = e.kind(), "request rejected: {e}");
                }
                // Registration problems are about the caller's own input.
                let detail = match &e {
                    AuthError::InvalidRegistration(reason) => Some(reason.to_string()),
                    _ => None,
                };
                (
                    status,
                    ErrorBody {
                        error: e.public_message(),
                        detail,
                    },
                )
            }
            Self::BadRequest(reason) => {
                tracing::debug!("malformed request body: {reason}");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorBody {
                        error: "invalid request",
                        detail: None,
                    },
                )
            }
            Self::Internal(reason) => {
                tracing::error!("handler failed: {reason}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "internal error",
                        detail: None,
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MalformedToken)?;
    let (scheme, token) = value.split_once(' ').ok_or(AuthError::MalformedToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AuthError::MalformedToken.into());
    }
    Ok(token.trim().to_string())
}

async fn health() -> &'static str {
    "ok"
}

async fn register(
    State(service): State<Arc<AuthService>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let Json(request) = payload?;
    let new_user = NewUser {
        username: request.username,
        email: request.email,
        secret: request.password,
        roles: request.roles,
        bucket_id: request.bucket_id,
    };
    // Hashing is CPU-bound; keep it off the async workers.
    let profile = tokio::task::spawn_blocking(move || service.register(&new_user)).await??;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn login(
    State(service): State<Arc<AuthService>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = payload?;
    let credential = Credential::new(request.identifier, request.password);
    let pair = tokio::task::spawn_blocking(move || service.login(&credential)).await??;
    Ok(Json(pair.into()))
}

async fn refresh(
    State(service): State<Arc<AuthService>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = payload?;
    let pair = service.refresh(&request.refresh_token)?;
    Ok(Json(pair.into()))
}

async fn logout(
    State(service): State<Arc<AuthService>>,
    headers: HeaderMap,
    payload: Option<Json<LogoutRequest>>,
) -> Result<StatusCode, ApiError> {
    let access_token = bearer_token(&headers)?;
    let refresh_token = payload.and_then(|Json(body)| body.refresh_token);
    service.logout(&access_token, refresh_token.as_deref())?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(
    State(service): State<Arc<AuthService>>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, ApiError> {
    let access_token = bearer_token(&headers)?;
    let verified = service.authenticate(&access_token)?;
    let profile = service.profile(&verified.subject)?;
    Ok(Json(profile))
}
