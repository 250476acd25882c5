use anyhow::Context;
use facevault::{Application, utils::{config::Config, logging}};
use tracing::{info, error};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = Config::new().context("Failed to load configuration")?;

    // Keep the guard alive so file logs are flushed on exit
    let _log_guard = logging::init(&config.logging).context("Failed to initialize logging")?;

    info!("Starting facevault v{}", env!("CARGO_PKG_VERSION"));

    // Initialize application
    let app = Application::new(config).await.map_err(|e| {
        error!("Failed to initialize application: {}", e);
        e
    })?;

    // Serve until SIGINT/SIGTERM
    if let Err(e) = app.run().await {
        error!("API server stopped with error: {}", e);
    }

    // Perform graceful shutdown
    if let Err(e) = app.shutdown().await {
        error!("Error during shutdown: {}", e);
    }

    Ok(())
}
