//! JWT token verification (and minting, for tooling and tests).

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::AuthError;
use crate::models::auth::TokenClaims;

/// Default lifetime for tokens minted by [`generate_access_token`].
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Mint a signed HS256 session token.
///
/// Production tokens come from the identity provider; this exists so local
/// tooling and tests can produce tokens the API accepts.
pub fn generate_access_token(
    user_id: &str,
    email: &str,
    roles: &[String],
    secret: &[u8],
) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = TokenClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        roles: roles.to_vec(),
        exp: (now + Duration::seconds(DEFAULT_TOKEN_TTL_SECS)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
}

/// Verify a session token, returning the claims on success.
///
/// Expired tokens, bad signatures and tokens without a subject are rejected.
pub fn verify_access_token(token: &str, secret: &[u8]) -> Option<TokenClaims> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::default();
    validation.validate_exp = true;
    decode::<TokenClaims>(token, &key, &validation)
        .ok()
        .map(|data| data.claims)
        .filter(|claims| !claims.sub.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn minted_token_verifies() {
        let token =
            generate_access_token("user_2abc", "a@example.com", &["admin".into()], SECRET).unwrap();
        let claims = verify_access_token(&token, SECRET).expect("valid token");
        assert_eq!(claims.sub, "user_2abc");
        assert_eq!(claims.email, "a@example.com");
        assert!(claims.has_role("admin"));
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = generate_access_token("user_2abc", "a@example.com", &[], SECRET).unwrap();
        assert!(verify_access_token(&token, b"other-secret").is_none());
    }

    #[test]
    fn expired_token_rejected() {
        let claims = TokenClaims {
            sub: "user_2abc".into(),
            email: String::new(),
            roles: vec![],
            exp: (Utc::now() - Duration::hours(2)).timestamp(),
            iat: (Utc::now() - Duration::hours(3)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();
        assert!(verify_access_token(&token, SECRET).is_none());
    }

    #[test]
    fn garbage_rejected() {
        assert!(verify_access_token("not-a-jwt", SECRET).is_none());
    }
}
