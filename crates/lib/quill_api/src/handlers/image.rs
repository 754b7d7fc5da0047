//! Image generation proxy.

use axum::Json;
use axum::extract::State;
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ImageRequest, ImageResponse};

/// `POST /api/generate-image` — one prompt in, one JPEG data URI out.
///
/// Requires a session but spends no credits.
pub async fn generate_image_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Json(req): Json<ImageRequest>,
) -> AppResult<Json<ImageResponse>> {
    if req.prompt.trim().is_empty() {
        return Err(AppError::Validation("No prompt provided".into()));
    }

    let image = state.image_generator.generate(&req.prompt).await?;
    info!(owner_id = %user.0.sub, "image generated");

    Ok(Json(ImageResponse {
        image: image.data_uri,
    }))
}
