//! sillage-api — HTTP API server for the sillage perfume catalog.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{Quota, RateLimiter};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sillage_api::{build_router, AppState};
use sillage_auth::TokenService;
use sillage_core::Config;
use sillage_db::{Database, FilesystemAssetBackend};
use sillage_mail::{Mailer, MemoryMailer, SmtpMailer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT - "json" or "text" (default: "text")
    //   LOG_FILE   - path to log file (optional, enables file logging)
    //   RUST_LOG   - standard env filter (default: "sillage_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sillage_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally tee logs into a daily-rotated file.
    let _file_guard = match &log_file {
        Some(path) => {
            let path = std::path::Path::new(path);
            let dir = path.parent().unwrap_or(std::path::Path::new("."));
            let name = path
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or("sillage-api.log");
            let appender = tracing_appender::rolling::daily(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            if log_format == "json" {
                registry
                    .with(tracing_subscriber::fmt::layer().json().with_writer(non_blocking))
                    .init();
            } else {
                registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_ansi(false)
                            .with_writer(non_blocking),
                    )
                    .init();
            }
            Some(guard)
        }
        None => {
            if log_format == "json" {
                registry.with(tracing_subscriber::fmt::layer().json()).init();
            } else {
                registry.with(tracing_subscriber::fmt::layer()).init();
            }
            None
        }
    };

    let config = Arc::new(Config::from_env()?);

    // Database + schema
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;
    sillage_db::log_pool_metrics(&db.pool);

    // Collaborators
    let assets = FilesystemAssetBackend::new(config.asset_dir.clone());
    assets.validate().await?;

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
        None => {
            warn!(
                subsystem = "api",
                component = "mail",
                "SMTP not configured; outbound mail is recorded in memory only"
            );
            Arc::new(MemoryMailer::new())
        }
    };

    let rate_limiter = config
        .rate_limit_per_minute
        .and_then(NonZeroU32::new)
        .map(|per_minute| Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))));
    if rate_limiter.is_none() {
        info!(subsystem = "api", "Rate limiting disabled");
    }

    let state = AppState {
        db,
        tokens: Arc::new(TokenService::new(config.token_secret.as_bytes())),
        mailer,
        assets: Arc::new(assets),
        rate_limiter,
        config: config.clone(),
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(
        subsystem = "api",
        op = "startup",
        addr = %config.bind_addr,
        "sillage-api listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!(subsystem = "api", op = "shutdown", "Shutting down");
}
