// Rental Ledger - Web Server
// REST API with Axum

use anyhow::{Context, Result};
use rental_ledger::{api, init_tracing, open_database, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env();
    init_tracing(settings.log_json);

    let conn = open_database(&settings.database_path)?;
    tracing::info!(path = %settings.database_path.display(), "database opened");

    let app = api::router(api::AppState::new(conn));

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.bind_addr))?;

    tracing::info!(addr = %settings.bind_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
    }
}
