use anyhow::Context;
use tokio::net::TcpListener;
use warden_server::{AppState, Config, api, logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let _log_guard = logger::init_logger(config.log_json, config.log_dir.as_deref())?;

    tracing::info!(
        addr = %config.http_addr,
        store = ?config.store,
        "Starting warden-server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let state = AppState::from_config(&config).await?;
    let app = api::router(state);

    let listener = TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http_addr))?;
    tracing::info!("HTTP server listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("warden-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
