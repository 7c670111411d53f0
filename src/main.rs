use anyhow::Result;
use dos_integration::infrastructure::{
    app::DosIntegration, config::Config, logging::Logging, metrics::Metrics,
    shutdown::ShutdownSignal,
};
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration before logging so LOG_LEVEL can drive the filter
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    Logging::new(&config.log_level)?.init()?;

    info!("Starting DoS integration...");
    info!("Configuration loaded: {:?}", config);

    if let Err(e) = Metrics::init(&config.metrics()) {
        error!("Failed to initialize metrics: {}", e);
        process::exit(1);
    }

    let shutdown = ShutdownSignal::new();
    shutdown.listen_for_ctrl_c();

    let service = match DosIntegration::new(config, shutdown.clone()).await {
        Ok(service) => {
            info!("DoS integration initialized successfully");
            service
        }
        Err(e) => {
            error!("Failed to initialize DoS integration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = service.run().await {
        error!("DoS integration failed: {}", e);
        process::exit(1);
    }

    info!("DoS integration shutdown complete");
    Ok(())
}
