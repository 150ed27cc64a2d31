//! Session-token extraction for REST handlers and the live gateway.

use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::auth::tokens::{self, TokenError};
use crate::error::ApiError;
use crate::models::user::UserRole;
use crate::AppState;

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins may act on anyone; everyone else only on themselves.
    pub fn require_self_or_admin(&self, user_id: &str) -> Result<(), ApiError> {
        if self.is_admin() || self.user_id == user_id {
            Ok(())
        } else {
            Err(ApiError::forbidden("Not allowed to modify another user"))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin role required"))
        }
    }
}

/// Rejection returned when the token is missing, invalid or expired.
#[derive(Debug)]
pub struct AuthError {
    status: StatusCode,
    message: &'static str,
}

impl AuthError {
    fn missing() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Missing Authorization header",
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self {
                status: StatusCode::FORBIDDEN,
                message: "Token has expired",
            },
            TokenError::Invalid => Self {
                status: StatusCode::UNAUTHORIZED,
                message: "Invalid token",
            },
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let code = if self.status == StatusCode::FORBIDDEN {
            "TOKEN_EXPIRED"
        } else {
            "UNAUTHORIZED"
        };
        let body = serde_json::json!({
            "error": {
                "code": code,
                "message": self.message
            }
        });
        (self.status, Json(body)).into_response()
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AuthError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let header = header.to_str().map_err(|_| AuthError {
        status: StatusCode::UNAUTHORIZED,
        message: "Invalid Authorization header format",
    })?;
    header.strip_prefix("Bearer ").map(Some).ok_or(AuthError {
        status: StatusCode::UNAUTHORIZED,
        message: "Invalid Authorization header format",
    })
}

fn authenticate(state: &AppState, token: &str) -> Result<AuthUser, AuthError> {
    let claims = tokens::verify_access_token(&state.keys, token)?;
    Ok(AuthUser {
        user_id: claims.sub,
        username: claims.username,
        role: claims.role,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or_else(AuthError::missing)?;
        authenticate(state, token)
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Authenticated user for the WebSocket upgrade. Browsers cannot set headers
/// on a WebSocket handshake, so the token may also arrive as `?token=`.
#[derive(Debug, Clone)]
pub struct WsAuthUser(pub AuthUser);

impl FromRequestParts<AppState> for WsAuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = bearer_token(parts)? {
            return authenticate(state, token).map(WsAuthUser);
        }

        let token = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.token)
            .filter(|t| !t.is_empty())
            .ok_or_else(AuthError::missing)?;

        authenticate(state, &token).map(WsAuthUser)
    }
}
