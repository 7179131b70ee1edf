//! Error taxonomy shared by every DevLog operation

use devlog_auth::PasswordError;
use sea_orm::DbErr;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input; `field` names the first field that failed
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Unknown log, team, user, notification or invite code
    #[error("{0}")]
    NotFound(String),

    /// The entity exists but the caller may not touch it
    #[error("{0}")]
    Forbidden(String),

    /// No valid session, or bad credentials
    #[error("{0}")]
    Unauthenticated(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("{0}")]
    Internal(String),
}

impl Error {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Error::Forbidden(message.into())
    }

    /// True for errors caused by the store or other infrastructure rather
    /// than by the request itself
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::Password(_) | Error::Internal(_)
        )
    }
}
