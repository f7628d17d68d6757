//! # Gatepass Server
//!
//! Entry point: loads configuration, wires the components and serves the
//! REST API until a shutdown signal arrives.

use gatepass_config::ConfigLoader;
use gatepass_core::{GatepassError, GatepassResult};
use gatepass_repository::{create_pool, DatabasePoolInterface};
use gatepass_rest::{create_router, AppState};
use gatepass_server::{
    di::AppContainer,
    logging::init_logging,
    startup::{print_startup_info, shutdown_signal},
};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Application error: {}", e);
        eprintln!("Application error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> GatepassResult<()> {
    // Load configuration
    let config_loader = ConfigLoader::from_default_location()?;
    let config = config_loader.get().await;

    init_logging(&config.observability);

    info!("Starting Gatepass Server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.environment);

    // Create database pool
    let db_pool = create_pool(&config.database).await?;
    if config.database.run_migrations {
        db_pool.run_migrations().await?;
    }

    let container = AppContainer::build(&config, db_pool.clone()).await?;
    let app_state = AppState::new(container.user_service());
    let router = create_router(app_state, &config.server);

    let rest_addr = config.server.rest_addr();
    info!("Starting REST server on http://{}", rest_addr);
    print_startup_info(&rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr)
        .await
        .map_err(|e| GatepassError::Internal(format!("Failed to bind REST: {e}")))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GatepassError::Internal(format!("REST server error: {e}")))?;

    db_pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}
