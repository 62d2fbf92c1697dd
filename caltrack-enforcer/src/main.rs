//! caltrack-enforcer - calibration compliance enforcement service
//!
//! Runs the status refresh, daily escalation scan and weekly summary on a
//! fixed schedule, and exposes secret-gated endpoints to trigger them by
//! hand.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use caltrack_common::config::{self, TomlConfig, MAILGUN_API_KEY_ENV, TRIGGER_SECRET_ENV};
use caltrack_common::db::{init_database, SqliteStore};
use caltrack_common::time::SystemClock;
use caltrack_enforcer::delivery::{DeliveryChannel, DisabledChannel, MailgunChannel};
use caltrack_enforcer::enforce::{Enforcer, EnforcerDeps, EnforcerOptions};
use caltrack_enforcer::schedule::spawn_scheduler;
use caltrack_enforcer::{build_router, AppState};

/// Command-line arguments for caltrack-enforcer
#[derive(Parser, Debug)]
#[command(name = "caltrack-enforcer")]
#[command(about = "Calibration compliance enforcement service")]
#[command(version)]
struct Args {
    /// Path to caltrack.toml
    #[arg(short, long, env = "CALTRACK_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the SQLite database
    #[arg(short, long, env = "CALTRACK_DATABASE_PATH")]
    database: Option<PathBuf>,

    /// HTTP listen address, e.g. 127.0.0.1:5780
    #[arg(short, long, env = "CALTRACK_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config::resolve_config_path(args.config.as_deref());
    let toml_config = TomlConfig::load(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    // RUST_LOG wins over [logging] level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting CalTrack Enforcer (caltrack-enforcer) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if config_path.exists() {
        info!("Config file: {}", config_path.display());
    } else {
        warn!("Config file {} not found; using defaults", config_path.display());
    }

    let schedule = toml_config
        .schedule
        .resolve()
        .context("Invalid [schedule] configuration")?;
    info!(
        offset = %schedule.offset,
        refresh = %schedule.status_refresh,
        enforcement = %schedule.daily_enforcement,
        weekly = %format!("{} {}", schedule.weekly_summary_day, schedule.weekly_summary),
        "Operational schedule"
    );

    let db_path = config::resolve_database_path(args.database.as_deref(), &toml_config);
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    let store = Arc::new(SqliteStore::new(pool, toml_config.mail_domain.clone()));

    let channel: Arc<dyn DeliveryChannel> = match config::read_env(MAILGUN_API_KEY_ENV) {
        Some(api_key) => {
            let mailgun = MailgunChannel::new(&toml_config.delivery, api_key)
                .context("Failed to build Mailgun client")?;
            info!("✓ Mailgun delivery via {}", mailgun.endpoint());
            Arc::new(mailgun)
        }
        None => {
            warn!("{} not set; notifications will be audited as failed", MAILGUN_API_KEY_ENV);
            Arc::new(DisabledChannel)
        }
    };

    let trigger_secret = config::read_env(TRIGGER_SECRET_ENV);
    if trigger_secret.is_none() {
        warn!("{} not set; manual triggers and record routes are disabled", TRIGGER_SECRET_ENV);
    }

    let options = EnforcerOptions {
        dedupe_same_day: toml_config.enforcement.dedupe_same_day,
        // Slightly above the transport timeout so reqwest reports first
        send_timeout: Duration::from_secs(toml_config.delivery.timeout_secs.max(1) + 5),
    };
    let enforcer = Arc::new(Enforcer::new(
        EnforcerDeps {
            store: store.clone(),
            directory: store.clone(),
            audit: store.clone(),
            channel,
            clock: Arc::new(SystemClock::new(schedule.offset)),
        },
        options,
    ));

    let scheduler = spawn_scheduler(enforcer.clone(), schedule);

    let bind = args
        .bind
        .unwrap_or_else(|| toml_config.bind_address.clone());
    let app = build_router(AppState::new(enforcer, store, trigger_secret));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {bind}"))?;
    info!("caltrack-enforcer listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    scheduler.abort();
    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
