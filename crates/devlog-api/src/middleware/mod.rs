//! API Middleware
//!
//! Session authentication for protected routes.

pub mod auth;

pub use auth::{require_auth, AuthUser, JwtState, SESSION_COOKIE};
