//! ImagePig image-generation client.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{GenerationError, ImageGenerator};

pub const DEFAULT_IMAGEPIG_URL: &str = "https://api.imagepig.com/";

/// Prefix of every data URI this module produces.
const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct ImageResponse {
    image_data: String,
}

/// A generated image, carried as a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub data_uri: String,
}

impl GeneratedImage {
    /// Wrap a base64 JPEG payload as a data URI. The payload is not re-encoded.
    pub fn from_base64(payload: &str) -> Self {
        Self {
            data_uri: format!("{JPEG_DATA_URI_PREFIX}{payload}"),
        }
    }

    /// Raw image bytes, e.g. for handing the image to object storage.
    pub fn decode(&self) -> Result<Vec<u8>, GenerationError> {
        let (_, payload) = self
            .data_uri
            .split_once(";base64,")
            .ok_or_else(|| GenerationError::Decode("not a base64 data URI".into()))?;
        STANDARD
            .decode(payload)
            .map_err(|e| GenerationError::Decode(format!("image payload: {e}")))
    }
}

/// Client for the ImagePig API.
#[derive(Debug, Clone)]
pub struct ImagePigClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ImagePigClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: DEFAULT_IMAGEPIG_URL.to_string(),
            api_key,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl ImageGenerator for ImagePigClient {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey("IMAGEPIG_API_KEY"))?;

        let response = self
            .http
            .post(&self.endpoint)
            .header("Api-Key", api_key)
            .json(&ImageRequest { prompt })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            warn!(status, body = %body, "ImagePig rejected image request");
            return Err(GenerationError::Upstream { status, body });
        }

        let data: ImageResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(format!("ImagePig response: {e}")))?;
        Ok(GeneratedImage::from_base64(&data.image_data))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    use super::*;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        format!("http://{addr}/")
    }

    #[test]
    fn wraps_payload_as_jpeg_data_uri() {
        let image = GeneratedImage::from_base64("aGVsbG8=");
        assert_eq!(image.data_uri, "data:image/jpeg;base64,aGVsbG8=");
        assert_eq!(image.decode().unwrap(), b"hello");
    }

    #[test]
    fn decode_rejects_plain_urls() {
        let image = GeneratedImage {
            data_uri: "https://cdn.example.com/a.jpg".into(),
        };
        assert!(matches!(image.decode(), Err(GenerationError::Decode(_))));
    }

    #[tokio::test]
    async fn success_returns_data_uri() {
        let app = Router::new().route(
            "/",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["prompt"], "a red fox");
                Json(serde_json::json!({"image_data": "Zm94"}))
            }),
        );
        let client = ImagePigClient::new(Some("k".into())).with_endpoint(serve(app).await);

        let image = client.generate("a red fox").await.unwrap();
        assert_eq!(image.data_uri, "data:image/jpeg;base64,Zm94");
    }

    #[tokio::test]
    async fn upstream_failure_carries_status_and_body() {
        let app = Router::new().route(
            "/",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "quota exceeded") }),
        );
        let client = ImagePigClient::new(Some("k".into())).with_endpoint(serve(app).await);

        let err = client.generate("a red fox").await.unwrap_err();
        match &err {
            GenerationError::Upstream { status, body } => {
                assert_eq!(*status, 500);
                assert!(body.contains("quota exceeded"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.to_string(), "API Error: 500 - quota exceeded");
    }
}
