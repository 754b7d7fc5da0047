//! Credit balance endpoints.

use axum::Json;
use axum::extract::{Path, State};
use quill_core::auth::require_role;
use quill_core::models::auth::ADMIN_ROLE;
use quill_core::models::credits::CreditAccount;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{GrantPlanRequest, GrantPlanResponse};
use crate::services::credits;

/// `GET /api/credits` — the caller's account, created on first visit.
pub async fn get_credits_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> AppResult<Json<CreditAccount>> {
    let account = credits::account_for(state.ledger.as_ref(), &user.0.sub, &user.0.email).await?;
    Ok(Json(account))
}

/// `PUT /api/admin/credits/{owner_id}` — reset a user's allowance to a plan.
pub async fn grant_plan_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(owner_id): Path<String>,
    Json(req): Json<GrantPlanRequest>,
) -> AppResult<Json<GrantPlanResponse>> {
    require_role(&user.0, ADMIN_ROLE)?;

    let remaining_actions = credits::grant_plan(state.ledger.as_ref(), &owner_id, req.plan).await?;
    Ok(Json(GrantPlanResponse {
        owner_id,
        plan: req.plan,
        remaining_actions,
    }))
}
