//! Completion proxy handlers.
//!
//! One endpoint per action kind. Each checks and spends a credit on the
//! server, then relays the model's text chunks as they arrive. The response
//! body owns the upstream stream: when the client disconnects, hyper drops
//! the body and the upstream connection is closed with it.

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::Response;
use futures_util::StreamExt;
use quill_core::actions::ActionKind;
use quill_core::credits::CREDITS_REMAINING_HEADER;
use tracing::warn;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::CompletionRequest;
use crate::services::completions::{StartedCompletion, start_completion};

/// `POST /api/rephrase`
pub async fn rephrase_handler(
    state: State<AppState>,
    user: axum::Extension<AuthenticatedUser>,
    body: Json<CompletionRequest>,
) -> AppResult<Response> {
    complete(ActionKind::Rephrase, state, user, body).await
}

/// `POST /api/summarize`
pub async fn summarize_handler(
    state: State<AppState>,
    user: axum::Extension<AuthenticatedUser>,
    body: Json<CompletionRequest>,
) -> AppResult<Response> {
    complete(ActionKind::Summarize, state, user, body).await
}

/// `POST /api/spellchecker`
pub async fn spellcheck_handler(
    state: State<AppState>,
    user: axum::Extension<AuthenticatedUser>,
    body: Json<CompletionRequest>,
) -> AppResult<Response> {
    complete(ActionKind::Spellcheck, state, user, body).await
}

/// `POST /api/generateBlog`
pub async fn generate_blog_handler(
    state: State<AppState>,
    user: axum::Extension<AuthenticatedUser>,
    body: Json<CompletionRequest>,
) -> AppResult<Response> {
    complete(ActionKind::Generate, state, user, body).await
}

async fn complete(
    kind: ActionKind,
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Json(req): Json<CompletionRequest>,
) -> AppResult<Response> {
    let owner_id = user.0.sub;
    let StartedCompletion {
        remaining_actions,
        stream,
    } = start_completion(
        state.ledger.as_ref(),
        state.text_generator.as_ref(),
        &owner_id,
        kind,
        &req.text,
    )
    .await?;

    let stream = stream.inspect(move |chunk| {
        if let Err(e) = chunk {
            warn!(owner_id = %owner_id, %kind, error = %e, "completion stream failed mid-response");
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CACHE_CONTROL, "no-cache")
        .header(CREDITS_REMAINING_HEADER, remaining_actions)
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(format!("Response build failed: {e}")))
}
