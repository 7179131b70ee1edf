//! Mapping from domain errors to HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use devlog_core::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Handler error; renders as `ErrorResponse` with a status and code
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Error::Database(_) | Error::Password(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self.0 {
            Error::Validation { .. } => "VALIDATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Forbidden(_) => "FORBIDDEN",
            Error::Unauthenticated(_) => "UNAUTHENTICATED",
            Error::Database(_) | Error::Password(_) | Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, field) = match &self.0 {
            Error::Validation { field, message } => (message.clone(), Some(field.to_string())),
            err if err.is_internal() => {
                error!("Request failed: {}", err);
                ("Internal server error".to_string(), None)
            }
            err => (err.to_string(), None),
        };

        (
            status,
            Json(ErrorResponse {
                error: message,
                code: Some(code.to_string()),
                field,
            }),
        )
            .into_response()
    }
}
