//! Session token verification.
//!
//! The identity provider signs session tokens with a shared HS256 secret;
//! `quill_api` verifies them on every protected request.

pub mod jwt;

use thiserror::Error;

use crate::models::auth::TokenClaims;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Missing role: {0}")]
    MissingRole(String),
}

/// Fail with [`AuthError::MissingRole`] unless the token grants `role`.
pub fn require_role(claims: &TokenClaims, role: &str) -> Result<(), AuthError> {
    if claims.has_role(role) {
        Ok(())
    } else {
        Err(AuthError::MissingRole(role.to_string()))
    }
}
