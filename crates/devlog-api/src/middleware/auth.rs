//! Session authentication middleware
//!
//! Reads the session JWT from the `session_token` cookie or an
//! `Authorization: Bearer` header, validates it and puts the user id into
//! the request extensions. Handlers re-read the user from the database, so a
//! token never grants more than the account currently has.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use devlog_auth::{JwtValidator, SESSION_TOKEN_TYPE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::ErrorResponse;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session_token";

/// Authenticated session extracted from the JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    /// Role at login time; informational only
    pub role: Option<String>,
}

/// JWT validation state shared across middleware instances
#[derive(Clone)]
pub struct JwtState {
    pub validator: Arc<JwtValidator>,
}

impl JwtState {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            validator: Arc::new(JwtValidator::new(secret)),
        }
    }
}

fn unauthorized(message: impl Into<String>, code: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.into(),
            code: Some(code.to_string()),
            field: None,
        }),
    )
}

/// Session token from the cookie, else from a Bearer header
pub fn session_token(headers: &HeaderMap) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .map(str::trim)
        .find_map(|c| {
            c.strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .filter(|t| !t.is_empty());

    if let Some(token) = from_cookie {
        return Ok(token.to_string());
    }

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            unauthorized(
                "Missing authentication token (cookie or Authorization header)",
                "MISSING_AUTH",
            )
        })?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| {
            unauthorized(
                "Invalid Authorization header format. Expected 'Bearer <token>'",
                "INVALID_AUTH_FORMAT",
            )
        })
}

/// Reject requests without a valid session token
///
/// # Errors
/// 401 when the token is missing, malformed, expired, signed with another
/// secret, not a session token, or its subject is not a user id.
pub async fn require_auth(
    State(state): State<Arc<JwtState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let token = session_token(request.headers())?;

    let claims = state
        .validator
        .validate(&token)
        .map_err(|e| unauthorized(format!("Invalid or expired token: {}", e), "INVALID_TOKEN"))?;

    match claims.token_type.as_deref() {
        Some(SESSION_TOKEN_TYPE) => {}
        Some(other) => {
            return Err(unauthorized(
                format!(
                    "Invalid token type '{}'. Expected 'session' token for API access",
                    other
                ),
                "INVALID_TOKEN_TYPE",
            ));
        }
        None => {
            return Err(unauthorized(
                "Token missing 'token_type' claim",
                "MISSING_TOKEN_TYPE",
            ));
        }
    }

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| unauthorized("Token subject is not a user id", "INVALID_SUBJECT"))?;

    request.extensions_mut().insert(AuthUser {
        user_id,
        role: claims.user_role,
    });

    Ok(next.run(request).await)
}
