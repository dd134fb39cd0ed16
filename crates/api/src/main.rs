use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use domain::services::PushGateway;
use persistence::db::{create_pool, run_migrations};
use persistence::PgTradeStore;
use shift_trade_api::app::{create_app, AppState};
use shift_trade_api::config::Config;
use shift_trade_api::jobs::{JobScheduler, TradeReminderJob};
use shift_trade_api::middleware;
use shift_trade_api::services::{ConsolePushGateway, LineIdTokenVerifier, LinePushGateway};

const SCHEDULER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    middleware::logging::init_logging(&config.logging)?;
    middleware::init_metrics()?;

    info!("Starting Shift Trade API v{}", env!("CARGO_PKG_VERSION"));

    let pool = create_pool(&(&config.database).into())
        .await
        .context("Failed to connect to database")?;

    info!("Running database migrations...");
    run_migrations(&pool).await?;
    info!("Migrations completed");

    let gateway: Arc<dyn PushGateway> = if config.line.enabled {
        Arc::new(LinePushGateway::new(&config.line)?)
    } else {
        warn!("LINE push disabled, notifications are logged only");
        Arc::new(ConsolePushGateway)
    };
    let verifier = Arc::new(LineIdTokenVerifier::new(&config.auth)?);

    let addr = config.socket_addr();
    let drain_timeout = Duration::from_secs(config.notifications.drain_timeout_secs);
    let reminders_enabled = config.reminders.enabled;

    let state = AppState::new(config, Arc::new(PgTradeStore::new(pool)), gateway, verifier);
    let dispatcher = state.dispatcher.clone();

    let mut scheduler = JobScheduler::new();
    if reminders_enabled {
        scheduler.register(TradeReminderJob::new(state.reminder_sweeper()));
    }
    scheduler.start();

    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(SCHEDULER_SHUTDOWN_TIMEOUT).await;

    if !dispatcher.drain(drain_timeout).await {
        warn!("Some notifications were still in flight at exit");
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
