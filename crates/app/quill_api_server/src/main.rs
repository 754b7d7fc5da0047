//! Quill API server binary.
//!
//! Serves the completion, image and credit endpoints. Configuration comes
//! from the environment (a `.env` file is honoured); flags override it.

use std::sync::Arc;

use clap::Parser;
use quill_api::AppState;
use quill_api::config::ApiConfig;
use quill_core::credits::{CreditLedger, MemoryCreditLedger, PgCreditLedger};
use quill_core::models::auth::ADMIN_ROLE;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "quill_api_server", about = "Quill API server")]
struct Args {
    /// Port to listen on; overrides the port in `BIND_ADDR`.
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep balances in process memory instead of PostgreSQL.
    ///
    /// Balances are lost on exit; meant for local development only.
    #[arg(long, default_value_t = false)]
    memory_ledger: bool,

    /// Print a session token for this user id and exit.
    #[arg(long, value_name = "OWNER_ID")]
    mint_token: Option<String>,

    /// Give the minted token the admin role.
    #[arg(long, default_value_t = false, requires = "mint_token")]
    admin: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("info,quill_api=debug,quill_core=debug")
                }),
        )
        .init();

    let args = Args::parse();
    let mut config = ApiConfig::from_env()?;

    if let Some(owner_id) = args.mint_token {
        let roles = if args.admin {
            vec![ADMIN_ROLE.to_string()]
        } else {
            Vec::new()
        };
        let token = quill_core::auth::jwt::generate_access_token(
            &owner_id,
            "",
            &roles,
            config.jwt_secret.as_bytes(),
        )?;
        println!("{token}");
        return Ok(());
    }

    if let Some(url) = args.database_url {
        config.pg_connection_url = url;
    }
    if let Some(port) = args.port {
        let host = config
            .bind_addr
            .rsplit_once(':')
            .map_or("127.0.0.1", |(host, _)| host)
            .to_string();
        config.bind_addr = format!("{host}:{port}");
    }

    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; completion endpoints will fail");
    }
    if config.imagepig_api_key.is_none() {
        warn!("IMAGEPIG_API_KEY is not set; image generation will fail");
    }

    let ledger: Arc<dyn CreditLedger> = if args.memory_ledger {
        warn!("using in-memory credit ledger; balances are not persisted");
        Arc::new(MemoryCreditLedger::new())
    } else {
        let pool =
            quill_core::migrate::connect(&config.pg_connection_url, args.max_connections).await?;

        info!("running database migrations");
        quill_api::migrate(&pool).await?;
        Arc::new(PgCreditLedger::new(pool))
    };

    let bind_addr = config.bind_addr.clone();
    let app = quill_api::router(AppState::new(config, ledger));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "REST API listening");

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
            }
            shutdown.cancel();
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
