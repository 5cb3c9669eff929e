use anyhow::Result;
use std::sync::Arc;

use old_contracts::{
    build_router, config::Config, logging, services::auth::StaticSecret, store, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Loaded configuration: {:?}", config);

    let store = store::connect(&config).await?;
    let auth = Arc::new(StaticSecret::new(config.access_password.clone()));
    let addr = config.bind_addr;

    // Build our application state
    let state = Arc::new(AppState::new(config, store, auth));
    let app = build_router(state);

    // Run it
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
