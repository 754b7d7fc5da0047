//! Authentication domain models.
//!
//! Tokens are minted by the external identity provider; Quill only verifies
//! them and reads the claims below.

use serde::{Deserialize, Serialize};

/// Role granted to operators who may reset other users' allowances.
pub const ADMIN_ROLE: &str = "admin";

/// JWT claims embedded in session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject — opaque identity-provider user ID (standard JWT `sub` claim).
    pub sub: String,
    /// Primary email address, if the provider includes one.
    #[serde(default)]
    pub email: String,
    /// Session roles (e.g. `["admin"]`).
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

impl TokenClaims {
    /// Whether the session carries the given role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
