//! Engagement API Server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p engage-api
//! ```
//!
//! Configuration is loaded from environment variables or a `.env` file.

use engage_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load configuration first so the log format can follow APP_ENV
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(&TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        name = %config.app.name,
        env = ?config.app.env,
        port = config.api.port,
        backend = ?config.storage.backend,
        counter = ?config.storage.counter,
        "Starting Engagement API Server..."
    );

    engage_api::run(config).await?;

    Ok(())
}
