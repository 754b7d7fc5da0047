//! Upstream generation services — text completion and image generation.
//!
//! Both are thin proxies: one prompt in, the provider's output back out.
//! No retries, no system message, no conversation state.
//!
//! # Providers
//!
//! - [`gemini::GeminiClient`] — streaming text via `streamGenerateContent`
//! - [`image::ImagePigClient`] — single base64 JPEG per prompt

pub mod gemini;
pub mod image;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

pub use gemini::GeminiClient;
pub use image::{GeneratedImage, ImagePigClient};

/// Lazy, finite sequence of completion text chunks. Not restartable.
pub type TextStream = BoxStream<'static, Result<String, GenerationError>>;

/// Errors from upstream generation services.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("API Error: {status} - {body}")]
    Upstream { status: u16, body: String },

    #[error("Upstream request failed: {0}")]
    Transport(String),

    #[error("Upstream response could not be decoded: {0}")]
    Decode(String),

    #[error("Missing API key: {0} is not set")]
    MissingApiKey(&'static str),
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        GenerationError::Transport(e.to_string())
    }
}

/// A text-generation model that streams its completion.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Open a completion stream for `prompt`.
    ///
    /// Errors returned here happen before the first chunk (bad status,
    /// connection failure); errors inside the stream happen mid-response.
    async fn stream_text(&self, prompt: &str) -> Result<TextStream, GenerationError>;
}

/// An image-generation model returning one image per prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GenerationError>;
}
