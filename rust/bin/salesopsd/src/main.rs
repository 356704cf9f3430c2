//! `salesopsd` — the SalesOps back-office server binary.
//!
//! Usage:
//!   salesopsd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/salesops/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod config;
mod routes;

use std::sync::Arc;

use clap::Parser;
use salesops_core::Module;
use tracing::info;

use config::ServerConfig;

/// SalesOps server.
#[derive(Parser, Debug)]
#[command(name = "salesopsd", about = "SalesOps back-office server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides default 0.0.0.0:8080).
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;
    if server_config.storage.data_dir.is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }

    // Initialize storage.
    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = salesops_core::ServiceConfig {
        data_dir: Some(data_dir),
        sqlite_path: server_config.storage.sqlite_path.as_ref().map(Into::into),
        listen: cli.listen.clone(),
    };

    let sql: Arc<dyn salesops_sql::SQLStore> = Arc::new(
        salesops_sql::SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );

    let catalog = server_config.catalog();
    if catalog.is_empty() {
        tracing::warn!("No products configured; no client will be given a SIM automatically");
    }
    let sim_service = sim::service::SimService::new(Arc::clone(&sql), catalog)
        .map_err(|e| anyhow::anyhow!("failed to initialize SIM service: {}", e))?;
    let sim_module = sim::SimModule::new(sim_service);
    info!("SIM module initialized");

    let faults = sim_module
        .service()
        .check_consistency()
        .map_err(|e| anyhow::anyhow!("consistency check failed: {}", e))?;
    if !faults.is_empty() {
        tracing::error!(count = faults.len(), "SIM bindings are inconsistent; see GET /sim/v1/consistency");
    }

    let app = routes::build_router(vec![(sim_module.name(), sim_module.routes())]);

    // Start server.
    let listener = tokio::net::TcpListener::bind(&core_config.listen).await?;
    info!("SalesOps server listening on {}", core_config.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
