//! API server configuration.

use quill_core::contact::TURNSTILE_VERIFY_URL;
use quill_core::generation::gemini::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use quill_core::generation::image::DEFAULT_IMAGEPIG_URL;
use thiserror::Error;

/// Configuration errors raised while reading the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is not a valid URL: {reason}")]
    InvalidUrl { var: &'static str, reason: String },
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// Shared HS256 secret of the identity provider.
    pub jwt_secret: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub imagepig_api_key: Option<String>,
    pub imagepig_url: String,
    pub turnstile_secret: Option<String>,
    pub turnstile_url: String,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                          | Default                          |
    /// |-----------------------------------|----------------------------------|
    /// | `BIND_ADDR`                       | `127.0.0.1:3100`                 |
    /// | `DATABASE_URL`                    | `postgres://localhost:5432/quill`|
    /// | `JWT_SECRET`                      | required                         |
    /// | `GEMINI_API_KEY`                  | unset (completions fail)         |
    /// | `GEMINI_MODEL`                    | `gemini-1.5-flash-latest`        |
    /// | `GEMINI_BASE_URL`                 | Google's public endpoint         |
    /// | `IMAGEPIG_API_KEY`                | unset (image generation fails)   |
    /// | `IMAGEPIG_BASE_URL`               | `https://api.imagepig.com/`      |
    /// | `CLOUDFLARE_TURNSTILE_SECRET_KEY` | unset (contact form fails)       |
    /// | `TURNSTILE_URL`                   | Cloudflare `siteverify`          |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ApiConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let url_or = |name: &'static str, default: &str| -> Result<String, ConfigError> {
            let value = non_empty(name).unwrap_or_else(|| default.to_string());
            url::Url::parse(&value).map_err(|e| ConfigError::InvalidUrl {
                var: name,
                reason: e.to_string(),
            })?;
            Ok(value)
        };

        Ok(Self {
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3100".into()),
            pg_connection_url: non_empty("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost:5432/quill".into()),
            jwt_secret: non_empty("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
            gemini_base_url: url_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL)?,
            imagepig_api_key: non_empty("IMAGEPIG_API_KEY"),
            imagepig_url: url_or("IMAGEPIG_BASE_URL", DEFAULT_IMAGEPIG_URL)?,
            turnstile_secret: non_empty("CLOUDFLARE_TURNSTILE_SECRET_KEY"),
            turnstile_url: url_or("TURNSTILE_URL", TURNSTILE_VERIFY_URL)?,
        })
    }
}
