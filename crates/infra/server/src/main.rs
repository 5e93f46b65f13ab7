//! Hookrelay server binary.
//!
//! Usage: `hookrelay-server [config.toml]`

use hookrelay_server::{load_config, RelayServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(&path)?,
        None => ServerConfig::default(),
    }
    .with_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(namespace = %config.namespace, provider_config = %config.provider_config, "starting hookrelay");

    // Create and run server
    RelayServer::new(config).run().await?;

    Ok(())
}
