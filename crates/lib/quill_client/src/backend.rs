//! Transport between the editor and the completion endpoints.

use async_trait::async_trait;
use futures_util::{Stream, StreamExt, TryStreamExt, future};
use quill_core::actions::ActionRequest;
use quill_core::credits::CREDITS_REMAINING_HEADER;
use quill_core::generation::GeneratedImage;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::DispatchError;
use crate::stream::CompletionStream;

/// A completion accepted by the server.
pub struct CompletionReply {
    /// Balance reported by the server after its debit, when it sent one.
    pub remaining_actions: Option<i64>,
    pub stream: CompletionStream,
}

/// Something that turns an [`ActionRequest`] into a completion stream.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send exactly one request. Implementations must not retry.
    async fn complete(
        &self,
        request: &ActionRequest,
        cancel: CancellationToken,
    ) -> Result<CompletionReply, DispatchError>;
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct ImageBody<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct ImageReply {
    image: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<u16>,
}

/// Client for the Quill HTTP API, authenticated with a session token.
#[derive(Debug, Clone)]
pub struct HttpCompletionBackend {
    http: Client,
    base_url: String,
    session_token: String,
}

impl HttpCompletionBackend {
    pub fn new(base_url: impl Into<String>, session_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_token: session_token.into(),
        }
    }

    /// Generate a featured image for the post. Spends no credits.
    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, DispatchError> {
        let response = self
            .http
            .post(format!("{}/api/generate-image", self.base_url))
            .bearer_auth(&self.session_token)
            .json(&ImageBody { prompt })
            .send()
            .await?;
        let response = check_status(response).await?;
        let reply: ImageReply = response.json().await?;
        Ok(GeneratedImage {
            data_uri: reply.image,
        })
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionBackend {
    async fn complete(
        &self,
        request: &ActionRequest,
        cancel: CancellationToken,
    ) -> Result<CompletionReply, DispatchError> {
        let url = format!("{}{}", self.base_url, request.kind.path());
        let send = self
            .http
            .post(&url)
            .bearer_auth(&self.session_token)
            .json(&CompletionBody {
                text: &request.source_text,
            })
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(DispatchError::Cancelled),
            response = send => response?,
        };
        let response = check_status(response).await?;

        let remaining_actions = response
            .headers()
            .get(CREDITS_REMAINING_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok());
        debug!(kind = %request.kind, ?remaining_actions, "completion accepted");

        let chunks = decode_utf8(response.bytes_stream())
            .try_filter(|text| future::ready(!text.is_empty()));

        Ok(CompletionReply {
            remaining_actions,
            stream: CompletionStream::new(chunks, cancel),
        })
    }
}

/// Map a non-success API response onto the matching [`DispatchError`].
async fn check_status(response: Response) -> Result<Response, DispatchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let (message, upstream_status) = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(err) => (err.message, err.status),
        Err(_) => (body, None),
    };
    warn!(status = status.as_u16(), reason = %message, "completion request rejected");

    Err(match status {
        StatusCode::BAD_REQUEST => DispatchError::InvalidInput(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DispatchError::Unauthorized(message),
        StatusCode::PAYMENT_REQUIRED => DispatchError::QuotaExhausted,
        StatusCode::SERVICE_UNAVAILABLE => DispatchError::Persist(message),
        _ => DispatchError::Upstream {
            status: upstream_status.or(Some(status.as_u16())),
            message,
        },
    })
}

/// Decode a byte stream as UTF-8 text, flushing held-back bytes at the end.
///
/// The stream stops after the first transport error.
fn decode_utf8<S, B, E>(bytes: S) -> impl Stream<Item = Result<String, DispatchError>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + 'static,
    E: std::fmt::Display + 'static,
{
    futures_util::stream::unfold(
        Some((bytes.boxed(), Utf8Decoder::default())),
        |state| async move {
            let (mut bytes, mut decoder) = state?;
            match bytes.next().await {
                Some(Ok(chunk)) => Some((Ok(decoder.push(chunk.as_ref())), Some((bytes, decoder)))),
                Some(Err(e)) => Some((Err(DispatchError::Transport(e.to_string())), None)),
                None => Some((Ok(decoder.finish()), None)),
            }
        },
    )
}

/// Incremental UTF-8 decoding across chunk boundaries.
///
/// A multi-byte character split between two network chunks is held back
/// until its remaining bytes arrive. Each invalid sequence becomes one
/// U+FFFD; decoding resumes right after it.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::new();
        let mut consumed = 0;
        loop {
            match std::str::from_utf8(&self.pending[consumed..]) {
                Ok(valid) => {
                    text.push_str(valid);
                    consumed = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid_end = consumed + e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[consumed..valid_end]));
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            consumed = valid_end + len;
                        }
                        // Incomplete character at the end: wait for more bytes.
                        None => {
                            consumed = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..consumed);
        text
    }

    /// Whatever is still held back, decoded lossily.
    fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}
