use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pass_download_core::{
    load_config, validate_config, AcquisitionOrchestrator, Downloader, HttpDownloader,
    LookupClient, PassRepositoryClient, RepositoryIngest, UnpaywallClient,
};
use pass_download_server::api::create_router;
use pass_download_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("PASS_DOWNLOAD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Lookup provider: {}", config.unpaywall.base_url);
    info!("Repository destination: {}", config.repository.dest);

    // Create collaborators
    let lookup: Arc<dyn LookupClient> = Arc::new(
        UnpaywallClient::new(&config.unpaywall, config.unpaywall.retry_policy())
            .context("Failed to create Unpaywall client")?,
    );
    let downloader: Arc<dyn Downloader> = Arc::new(
        HttpDownloader::new(&config.download).context("Failed to create downloader")?,
    );
    let repository: Arc<dyn RepositoryIngest> = Arc::new(
        PassRepositoryClient::new(&config.repository)
            .context("Failed to create repository client")?,
    );

    // Create orchestrator
    let orchestrator = Arc::new(AcquisitionOrchestrator::new(
        config.acquisition.clone(),
        Arc::clone(&lookup),
        downloader,
        repository,
    ));
    info!(
        "Acquisition orchestrator ready (pipeline timeout {}s)",
        config.acquisition.pipeline_timeout_secs
    );

    let addr = SocketAddr::new(config.server.host, config.server.port);

    // Create app state and router
    let state = Arc::new(AppState::new(config, lookup, orchestrator));
    let app = create_router(state);

    // Start server
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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
