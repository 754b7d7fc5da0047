//! Gemini streaming text client.
//!
//! Calls `POST /v1beta/models/{model}:streamGenerateContent?alt=sse` and
//! turns each server-sent event into the text of its first candidate.

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{GenerationError, TextGenerator, TextStream};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Streaming client for Google's Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Client against the public endpoint with the default model.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn stream_text(&self, prompt: &str) -> Result<TextStream, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey("GEMINI_API_KEY"))?;

        let response = self
            .http
            .post(self.stream_url())
            .query(&[("alt", "sse")])
            .header("x-goog-api-key", api_key)
            .json(&GenerateRequest {
                contents: [RequestContent {
                    role: "user",
                    parts: [RequestPart { text: prompt }],
                }],
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            warn!(status, model = %self.model, "Gemini rejected completion request");
            return Err(GenerationError::Upstream { status, body });
        }

        debug!(model = %self.model, "Gemini completion stream opened");
        let events = sse_stream::SseStream::from_byte_stream(response.bytes_stream());
        Ok(text_chunks(events).boxed())
    }
}

/// Map SSE events to completion text, dropping events that carry none.
fn text_chunks<S>(events: S) -> impl Stream<Item = Result<String, GenerationError>> + Send + 'static
where
    S: Stream<Item = Result<sse_stream::Sse, sse_stream::Error>> + Send + 'static,
{
    events.filter_map(|event| async move {
        match event {
            Ok(sse) => {
                let data = sse.data?;
                chunk_text(&data).transpose()
            }
            Err(e) => Some(Err(GenerationError::Transport(format!(
                "SSE stream error: {e}"
            )))),
        }
    })
}

/// Text of the first candidate in one stream event, if any.
fn chunk_text(data: &str) -> Result<Option<String>, GenerationError> {
    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| GenerationError::Decode(format!("Gemini stream chunk: {e}")))?;

    let text: String = chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    Ok((!text.is_empty()).then_some(text))
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::http::{StatusCode, header};
    use axum::routing::post;

    use super::*;

    fn event(data: &str) -> Result<sse_stream::Sse, sse_stream::Error> {
        Ok(sse_stream::Sse {
            event: None,
            data: Some(data.to_string()),
            id: None,
            retry: None,
        })
    }

    fn candidate(text: &str) -> String {
        serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        })
        .to_string()
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        format!("http://{addr}")
    }

    #[test]
    fn chunk_text_joins_parts_of_first_candidate() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"Once"},{"text":" upon"}]}},{"content":{"parts":[{"text":"ignored"}]}}]}"#;
        assert_eq!(chunk_text(data).unwrap(), Some("Once upon".to_string()));
    }

    #[test]
    fn chunk_text_without_text_is_none() {
        let data = r#"{"candidates":[{"finishReason":"STOP"}],"usageMetadata":{"totalTokenCount":9}}"#;
        assert_eq!(chunk_text(data).unwrap(), None);
    }

    #[test]
    fn chunk_text_rejects_non_json() {
        assert!(matches!(
            chunk_text("not json"),
            Err(GenerationError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn text_chunks_preserves_order_and_skips_empty_events() {
        let events = vec![
            event(&candidate("Once")),
            Ok(sse_stream::Sse {
                event: Some("ping".into()),
                data: None,
                id: None,
                retry: None,
            }),
            event(&candidate(" upon")),
            event(r#"{"candidates":[]}"#),
            event(&candidate(" a")),
            event(&candidate(" time")),
        ];
        let chunks: Vec<String> = text_chunks(futures_util::stream::iter(events))
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["Once", " upon", " a", " time"]);
    }

    #[tokio::test]
    async fn streams_chunks_from_upstream_sse() {
        let body: String = ["Once", " upon", " a", " time"]
            .iter()
            .map(|t| format!("data: {}\r\n\r\n", candidate(t)))
            .collect();
        let app = Router::new().route(
            "/v1beta/models/{model}",
            post(move || {
                let body = body.clone();
                async move { ([(header::CONTENT_TYPE, "text/event-stream")], body) }
            }),
        );
        let base = serve(app).await;

        let client = GeminiClient::new(Some("test-key".into())).with_base_url(base);
        let stream = client.stream_text("prompt").await.unwrap();
        let text: Vec<String> = stream.map(|c| c.unwrap()).collect().await;
        assert_eq!(text.concat(), "Once upon a time");
    }

    #[tokio::test]
    async fn upstream_error_status_is_reported() {
        let app = Router::new().route(
            "/v1beta/models/{model}",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limited") }),
        );
        let base = serve(app).await;

        let client = GeminiClient::new(Some("test-key".into())).with_base_url(base);
        match client.stream_text("prompt").await {
            Err(GenerationError::Upstream { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected upstream error"),
        }
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let client = GeminiClient::new(None).with_base_url("http://127.0.0.1:9");
        assert!(matches!(
            client.stream_text("prompt").await,
            Err(GenerationError::MissingApiKey("GEMINI_API_KEY"))
        ));
    }
}
