//! Contact form submissions, gated by Cloudflare Turnstile.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const TURNSTILE_VERIFY_URL: &str =
    "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Contact form errors.
#[derive(Debug, Error)]
pub enum ContactError {
    #[error("Missing required fields")]
    MissingFields,

    #[error("Turnstile verification failed")]
    VerificationFailed,

    #[error("Turnstile unavailable: {0}")]
    Upstream(String),
}

/// A message sent from the public contact page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub turnstile_token: String,
}

impl ContactSubmission {
    /// Every field, the challenge token included, must be non-blank.
    pub fn validate(&self) -> Result<(), ContactError> {
        let fields = [
            &self.name,
            &self.email,
            &self.subject,
            &self.message,
            &self.turnstile_token,
        ];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(ContactError::MissingFields);
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct SiteverifyRequest<'a> {
    secret: &'a str,
    response: &'a str,
}

#[derive(Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Server-side Turnstile token verification.
#[derive(Debug, Clone)]
pub struct TurnstileVerifier {
    http: Client,
    endpoint: String,
    secret: Option<String>,
}

impl TurnstileVerifier {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: TURNSTILE_VERIFY_URL.to_string(),
            secret,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Check a challenge token with Cloudflare.
    pub async fn verify(&self, token: &str) -> Result<(), ContactError> {
        let secret = self.secret.as_deref().ok_or_else(|| {
            ContactError::Upstream("CLOUDFLARE_TURNSTILE_SECRET_KEY is not set".into())
        })?;

        let outcome: SiteverifyResponse = self
            .http
            .post(&self.endpoint)
            .json(&SiteverifyRequest {
                secret,
                response: token,
            })
            .send()
            .await
            .map_err(|e| ContactError::Upstream(e.to_string()))?
            .json()
            .await
            .map_err(|e| ContactError::Upstream(format!("siteverify response: {e}")))?;

        if !outcome.success {
            warn!(errors = ?outcome.error_codes, "turnstile token rejected");
            return Err(ContactError::VerificationFailed);
        }
        Ok(())
    }
}
