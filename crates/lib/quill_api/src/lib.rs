//! # quill_api
//!
//! HTTP API library for Quill.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use quill_core::contact::TurnstileVerifier;
use quill_core::credits::CreditLedger;
use quill_core::generation::{GeminiClient, ImageGenerator, ImagePigClient, TextGenerator};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{completions, contact, credits, health, image};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Per-user AI-action balances.
    pub ledger: Arc<dyn CreditLedger>,
    /// Streaming model behind the four completion endpoints.
    pub text_generator: Arc<dyn TextGenerator>,
    pub image_generator: Arc<dyn ImageGenerator>,
    pub turnstile: TurnstileVerifier,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// State with the production upstream clients built from `config`.
    pub fn new(config: ApiConfig, ledger: Arc<dyn CreditLedger>) -> Self {
        let text_generator = GeminiClient::new(config.gemini_api_key.clone())
            .with_base_url(config.gemini_base_url.clone())
            .with_model(config.gemini_model.clone());
        let image_generator = ImagePigClient::new(config.imagepig_api_key.clone())
            .with_endpoint(config.imagepig_url.clone());
        let turnstile = TurnstileVerifier::new(config.turnstile_secret.clone())
            .with_endpoint(config.turnstile_url.clone());

        Self {
            ledger,
            text_generator: Arc::new(text_generator),
            image_generator: Arc::new(image_generator),
            turnstile,
            config,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `quill_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    quill_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::GET_API_HEALTH, get(health::health_handler))
        .route(routes::POST_API_CONTACT, post(contact::contact_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::POST_API_REPHRASE, post(completions::rephrase_handler))
        .route(routes::POST_API_SUMMARIZE, post(completions::summarize_handler))
        .route(
            routes::POST_API_SPELLCHECKER,
            post(completions::spellcheck_handler),
        )
        .route(
            routes::POST_API_GENERATE_BLOG,
            post(completions::generate_blog_handler),
        )
        .route(
            routes::POST_API_GENERATE_IMAGE,
            post(image::generate_image_handler),
        )
        .route(routes::GET_API_CREDITS, get(credits::get_credits_handler))
        .route(
            routes::PUT_API_ADMIN_CREDITS_OWNER,
            put(credits::grant_plan_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
