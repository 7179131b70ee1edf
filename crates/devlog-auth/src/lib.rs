//! Credentials and session tokens for DevLog

pub mod jwt;
pub mod password;

pub use jwt::{JwtError, JwtValidator, SessionClaims, SESSION_TOKEN_TYPE};
pub use password::{hash_password, verify_password, PasswordError, MIN_PASSWORD_LEN};
