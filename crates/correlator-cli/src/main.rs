// crates/correlator-cli/src/main.rs
// ============================================================================
// Module: Correlator Process Entry Point
// Description: Configuration load, pool/migrations, background task tree,
//   graceful shutdown.
// Purpose: Produce the runnable `correlator` binary composing every crate
//   in the workspace.
// Dependencies: clap, correlator-auth, correlator-config, correlator-core,
//   correlator-http, correlator-projections, correlator-store, sqlx, tokio,
//   tokio-util, tower-http, tracing, tracing-subscriber.
// ============================================================================

//! ## Overview
//! Wires every crate in the workspace into one process: loads `AppConfig`
//! and the aliasing YAML, opens the database pool and runs migrations,
//! builds the HTTP router, and spawns the reaper, rate-limiter eviction
//! sweep, and projection-refresh scheduler as cancellable background
//! tasks. Shuts down within a 5 second bound on `Ctrl+C`/`SIGTERM`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use clap::Parser;
use correlator_auth::PluginTierConfig;
use correlator_auth::RateLimiter;
use correlator_config::AppConfig;
use correlator_http::build_router;
use correlator_http::AppState;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

/// Default interval between projection-refresh scheduler ticks.
const DEFAULT_PROJECTION_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
/// Bound on how long shutdown waits for in-flight work to drain.
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "correlator", about = "OpenLineage RunEvent ingestion and correlation service")]
struct Cli {
    /// Overrides `CORRELATOR_CONFIG_PATH` (the aliasing YAML location).
    #[arg(long)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum BootstrapError {
    #[error("configuration error: {0}")]
    Config(#[from] correlator_config::ConfigError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "correlator failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), BootstrapError> {
    let cli = Cli::parse();
    let mut config = AppConfig::bootstrap()?;
    if let Some(path) = cli.config_path {
        config.config_path = path;
    }

    let pool = PgPoolOptions::new().max_connections(20).connect(&config.database_url).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    let alias_config = Arc::new(correlator_config::load_alias_config(&config.config_path));
    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limiter.global.rps,
        config.rate_limiter.global.burst,
        config.rate_limiter.unauth.rps,
        config.rate_limiter.unauth.burst,
        PluginTierConfig {
            rps: config.rate_limiter.plugin.rps,
            burst: config.rate_limiter.plugin.burst,
            idle_timeout: config.rate_limiter.idle_timeout,
            max_plugins: config.rate_limiter.max_plugins,
        },
    ));

    let state = AppState {
        pool: pool.clone(),
        alias_config,
        rate_limiter: Arc::clone(&rate_limiter),
        auth_enabled: config.auth_enabled,
        started_at: Instant::now(),
    };

    let cors = CorsLayer::permissive();
    let router = build_router(state, cors);

    let cancellation = CancellationToken::new();
    let reaper_pool = pool.clone();
    let reaper_config = correlator_store::ReaperConfig {
        tick: config.idempotency_cleanup_interval,
        ..correlator_store::ReaperConfig::default()
    };
    let reaper_cancellation = cancellation.clone();
    let reaper_handle = tokio::spawn(async move {
        correlator_store::reaper::run(&reaper_pool, reaper_config, reaper_cancellation).await;
    });
    let eviction_handle = tokio::spawn(correlator_auth::run_eviction_loop(
        Arc::clone(&rate_limiter),
        config.rate_limiter.cleanup_interval,
        cancellation.clone(),
    ));
    let projection_handle =
        tokio::spawn(run_projection_refresh_loop(pool, DEFAULT_PROJECTION_REFRESH_INTERVAL, cancellation.clone()));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!(addr = "0.0.0.0:8080", "correlator listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancellation.cancel();
    let _ = tokio::time::timeout(
        SHUTDOWN_GRACE_PERIOD,
        futures_join(reaper_handle, eviction_handle, projection_handle),
    )
    .await;

    Ok(())
}

/// Runs `refresh_views` on an interval until `cancellation` fires.
async fn run_projection_refresh_loop(
    pool: sqlx::PgPool,
    interval: Duration,
    cancellation: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            () = cancellation.cancelled() => return,
            _ = ticker.tick() => {
                if let Err(error) = correlator_projections::refresh_views(&pool).await {
                    tracing::warn!(%error, "projection refresh failed, will retry next tick");
                }
            }
        }
    }
}

/// Joins three background task handles, ignoring individual join errors
/// (a panicked background task should not prevent the others from being
/// awaited during shutdown).
async fn futures_join(
    a: tokio::task::JoinHandle<()>,
    b: tokio::task::JoinHandle<()>,
    c: tokio::task::JoinHandle<()>,
) {
    let _ = tokio::join!(a, b, c);
}

/// Resolves when `Ctrl+C` or, on unix, `SIGTERM` is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut signal) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        else {
            return;
        };
        signal.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
