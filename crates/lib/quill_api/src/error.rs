//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use quill_core::actions::ActionError;
use quill_core::auth::AuthError;
use quill_core::contact::ContactError;
use quill_core::credits::CreditError;
use quill_core::generation::GenerationError;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No AI actions remaining")]
    QuotaExhausted,

    #[error("Credit ledger unavailable: {0}")]
    Persist(String),

    #[error("{message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message, upstream_status) = match &self {
            AppError::Validation(m) => {
                (StatusCode::BAD_REQUEST, "validation_error", m.as_str(), None)
            }
            AppError::InvalidInput(m) => {
                (StatusCode::BAD_REQUEST, "invalid_input", m.as_str(), None)
            }
            AppError::QuotaExhausted => (
                StatusCode::PAYMENT_REQUIRED,
                "quota_exhausted",
                "You have no AI actions remaining. Upgrade your plan to continue.",
                None,
            ),
            AppError::Persist(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "persist_error",
                "Could not update your AI credits. Please try again.",
                None,
            ),
            AppError::Upstream { status, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "upstream_error",
                message.as_str(),
                *status,
            ),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str(), None),
            AppError::Unauthorized(m) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str(), None)
            }
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str(), None),
            AppError::Internal(m) => {
                error!(detail = %m, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                    None,
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
            status: upstream_status,
        });
        (status, body).into_response()
    }
}

impl From<ActionError> for AppError {
    fn from(e: ActionError) -> Self {
        match e {
            ActionError::EmptyInput => AppError::InvalidInput(e.to_string()),
            ActionError::UnknownKind(kind) => {
                AppError::NotFound(format!("Unknown action kind: {kind}"))
            }
        }
    }
}

impl From<CreditError> for AppError {
    fn from(e: CreditError) -> Self {
        match e {
            CreditError::Exhausted => AppError::QuotaExhausted,
            CreditError::Validation(msg) => AppError::Validation(msg),
            CreditError::Store(msg) => {
                warn!(error = %msg, "credit ledger unavailable");
                AppError::Persist(msg)
            }
            CreditError::DbError(e) => {
                warn!(error = %e, "credit ledger query failed");
                AppError::Persist(e.to_string())
            }
        }
    }
}

impl From<GenerationError> for AppError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::Upstream { status, .. } => AppError::Upstream {
                status: Some(status),
                message: e.to_string(),
            },
            GenerationError::Transport(_) | GenerationError::Decode(_) => AppError::Upstream {
                status: None,
                message: e.to_string(),
            },
            GenerationError::MissingApiKey(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<ContactError> for AppError {
    fn from(e: ContactError) -> Self {
        match e {
            ContactError::MissingFields | ContactError::VerificationFailed => {
                AppError::Validation(e.to_string())
            }
            ContactError::Upstream(msg) => AppError::Internal(msg),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::TokenError(msg) => AppError::Unauthorized(msg),
            AuthError::MissingRole(role) => {
                AppError::Forbidden(format!("The '{role}' role is required"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn exhausted_credits_map_to_payment_required() {
        let (status, json) = body_json(CreditError::Exhausted.into()).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(json["error"], "quota_exhausted");
        assert!(json.get("status").is_none());
    }

    #[tokio::test]
    async fn ledger_outage_maps_to_service_unavailable() {
        let (status, json) = body_json(CreditError::Store("down".into()).into()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"], "persist_error");
    }

    #[tokio::test]
    async fn upstream_failure_carries_status_and_body() {
        let err = GenerationError::Upstream {
            status: 500,
            body: "quota exceeded".into(),
        };
        let (status, json) = body_json(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["status"], 500);
        assert_eq!(json["message"], "API Error: 500 - quota exceeded");
    }

    #[tokio::test]
    async fn empty_input_is_bad_request() {
        let (status, json) = body_json(ActionError::EmptyInput.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_input");
        assert_eq!(json["message"], "No text provided");
    }

    #[tokio::test]
    async fn missing_role_is_forbidden() {
        let (status, _) = body_json(AuthError::MissingRole("admin".into()).into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
