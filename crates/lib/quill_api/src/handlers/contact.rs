//! Public contact form.

use axum::Json;
use axum::extract::State;
use quill_core::contact::ContactSubmission;
use tracing::info;

use crate::AppState;
use crate::error::AppResult;
use crate::models::ContactResponse;

/// `POST /api/contact` — validate the form and its Turnstile token.
pub async fn contact_handler(
    State(state): State<AppState>,
    Json(submission): Json<ContactSubmission>,
) -> AppResult<Json<ContactResponse>> {
    submission.validate()?;
    state.turnstile.verify(&submission.turnstile_token).await?;
    info!(email = %submission.email, subject = %submission.subject, "contact form submitted");

    Ok(Json(ContactResponse {
        success: true,
        message: "Contact form submitted successfully".into(),
    }))
}
