use std::net::SocketAddr;

use toprepos::api::{AppState, router};
use toprepos::connect_and_migrate;

use crate::ServeArgs;
use crate::config::Config;

/// Serve the read API until Ctrl+C, then close the pool.
pub(crate) async fn handle_serve(
    args: ServeArgs,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    let db = connect_and_migrate(database_url, &config.pool_options()).await?;
    let app = router(AppState::new(db.clone()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Serving read API");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, closing database pool");
    db.close().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
