//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    extract::State,
    http,
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use base64::Engine;
use base64::engine::general_purpose;
use kernel::response::ApiResponse;
use outbox::{
    BackgroundJobRunner, HandlerRegistry, OutboxConfig, OutboxProcessor, OutboxProcessorJob,
    OutboxRetentionJob, PgOutboxRepository,
};
use platform::correlation::{CORRELATION_ID_HEADER, correlation_id};
use platform::jwt::{JwtConfig, JwtService};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use users::{
    AccountMailer, ExpiredSessionCleanupJob, LoggingEmailSender, PgUsersRepository, UsersAppState,
    UsersConfig, register_handlers, users_router,
};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,users=info,outbox=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    let pool = PgPoolOptions::new()
        .max_connections(env_or("DATABASE_MAX_CONNECTIONS", 5)?)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    // Configuration
    let users_config = Arc::new(users_config()?);
    let outbox_config = Arc::new(outbox_config()?);
    tracing::info!(users = ?users_config, outbox = ?outbox_config, "Configuration loaded");

    let users_repo = Arc::new(PgUsersRepository::new(pool.clone()));
    let outbox_repo = Arc::new(PgOutboxRepository::new(pool.clone()));

    // Startup cleanup: remove stale sessions
    // Errors here should not prevent server startup
    let session_cleanup = ExpiredSessionCleanupJob::new(users_repo.clone(), &users_config);
    match session_cleanup.cleanup().await {
        Ok(sessions) => {
            tracing::info!(sessions_deleted = sessions, "Session cleanup completed");
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Session cleanup failed, continuing anyway"
            );
        }
    }

    let jwt = Arc::new(JwtService::new(users_config.jwt.clone())?);
    let mailer = AccountMailer::new(Arc::new(LoggingEmailSender), users_config.clone());

    // Outbox consumers
    let mut registry = HandlerRegistry::new();
    register_handlers(&mut registry, users_repo.clone(), mailer.clone());
    let registry = Arc::new(registry);
    tracing::info!(event_types = ?registry.registered_types(), "Outbox handlers registered");

    // Background jobs
    let mut jobs = BackgroundJobRunner::new();
    if outbox_config.enabled {
        let processor =
            OutboxProcessor::new(outbox_repo.clone(), registry.clone(), outbox_config.clone());
        jobs.spawn(Arc::new(OutboxProcessorJob::new(processor, &outbox_config)));
        jobs.spawn(Arc::new(OutboxRetentionJob::new(outbox_repo, &outbox_config)));
    } else {
        tracing::warn!("Outbox relay disabled; events will accumulate");
    }
    jobs.spawn(Arc::new(session_cleanup));

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:5173,http://127.0.0.1:5173".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            CORRELATION_ID_HEADER,
        ]))
        .expose_headers([CORRELATION_ID_HEADER])
        .allow_credentials(true);

    // Build router
    let state = UsersAppState {
        repo: users_repo,
        jwt,
        config: users_config,
        mailer,
    };

    let app = Router::new()
        .nest("/api", users_router(state))
        .merge(Router::new().route("/health", get(health)).with_state(pool))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(correlation_id))
        .layer(cors);

    // Start server
    let addr: SocketAddr = env_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 31113)))?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped, waiting for background jobs");
    jobs.shutdown_and_join().await;

    Ok(())
}

/// GET /health
async fn health(State(pool): State<PgPool>) -> Response {
    match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => ApiResponse::ok(serde_json::json!({ "status": "healthy" })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::failed(serde_json::json!({ "status": "unhealthy" })),
            )
                .into_response()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// ============================================================================
// Configuration
// ============================================================================

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} is invalid: {e}")),
        Err(_) => Ok(default),
    }
}

fn jwt_config() -> anyhow::Result<JwtConfig> {
    let mut config = if cfg!(debug_assertions) && env::var("JWT_SECRET").is_err() {
        tracing::warn!("JWT_SECRET not set, using a random development secret");
        JwtConfig::development()
    } else {
        let secret = env::var("JWT_SECRET").context("JWT_SECRET must be set in production")?;
        JwtConfig::new(
            secret,
            env::var("JWT_ISSUER").unwrap_or_else(|_| "ecommerce-api".to_string()),
            env::var("JWT_AUDIENCE").unwrap_or_else(|_| "ecommerce-clients".to_string()),
        )
    };
    config.access_token_ttl = Duration::from_secs(env_or("JWT_ACCESS_TOKEN_MINUTES", 15u64)? * 60);
    config.refresh_token_ttl =
        Duration::from_secs(env_or("JWT_REFRESH_TOKEN_DAYS", 7u64)? * 24 * 3600);
    config.validate()?;
    Ok(config)
}

fn users_config() -> anyhow::Result<UsersConfig> {
    let jwt = jwt_config()?;
    let mut config = match env::var("TOKEN_SECRET") {
        Ok(secret_b64) => {
            let secret = general_purpose::STANDARD
                .decode(secret_b64.trim())
                .context("TOKEN_SECRET must be base64")?;
            UsersConfig::new(jwt, secret)
        }
        Err(_) if cfg!(debug_assertions) => {
            let development = UsersConfig::development();
            let mut config = UsersConfig::new(jwt, development.token_secret);
            config.cookie = development.cookie;
            config
        }
        Err(_) => anyhow::bail!("TOKEN_SECRET must be set in production"),
    };
    config.require_confirmed_email = env_or("REQUIRE_CONFIRMED_EMAIL", false)?;
    if let Ok(url) = env::var("APP_BASE_URL") {
        config.app_base_url = url;
    }
    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}

fn outbox_config() -> anyhow::Result<OutboxConfig> {
    let defaults = OutboxConfig::default();
    let config = OutboxConfig {
        enabled: env_or("OUTBOX_ENABLED", defaults.enabled)?,
        polling_interval: Duration::from_secs(env_or(
            "OUTBOX_POLLING_INTERVAL_SECS",
            defaults.polling_interval.as_secs(),
        )?),
        batch_size: env_or("OUTBOX_BATCH_SIZE", defaults.batch_size)?,
        max_retry_attempts: env_or("OUTBOX_MAX_RETRY_ATTEMPTS", defaults.max_retry_attempts)?,
        retention: Duration::from_secs(
            env_or("OUTBOX_RETENTION_DAYS", defaults.retention.as_secs() / 86_400)? * 86_400,
        ),
        process_in_order: env_or("OUTBOX_PROCESS_IN_ORDER", defaults.process_in_order)?,
        ..defaults
    };
    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}
