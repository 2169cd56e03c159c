mod config;
mod domain;
mod error;
mod handlers;
mod middleware;
mod repositories;
mod routes;

use anyhow::Context;
use config::AppState;
use routes::create_routes;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Entry point payment reconciliation service
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    setup_logging();

    let app_state = AppState::from_env()
        .await
        .map_err(anyhow::Error::msg)
        .context("Failed to initialize application state")?;

    if app_state.config.run_migrations {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&app_state.db)
            .await
            .context("Failed to run migrations")?;
    }

    info!("Payment Service starting on {}", app_state.config.bind_address());

    start_server(app_state).await
}

/// Inisialisasi structured logging berdasarkan RUST_LOG
fn setup_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("payment_service=debug,tower_http=debug")
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

async fn start_server(app_state: AppState) -> anyhow::Result<()> {
    let address = app_state.config.bind_address();
    let app = create_routes(app_state)?;

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!("Server running on http://{}", address);
    info!("API Docs: http://{}/docs", address);

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Received shutdown signal");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Payment Service shutdown successfully");
    Ok(())
}
