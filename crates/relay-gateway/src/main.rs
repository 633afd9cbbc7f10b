//! Relay Gateway entry point
//!
//! Run with:
//! ```bash
//! cargo run -p relay-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use relay_common::{try_init_tracing_with_config, AppConfig, JwtService, TracingConfig};
use relay_gateway::auth::JwtVerifier;
use relay_gateway::memory::{InMemoryChatDirectory, InMemoryMessageStore, InMemoryStatusStore};
use relay_gateway::Collaborators;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, "Gateway failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first; tracing format depends on the environment
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        e
    })?;

    let tracing_config = if config.app.env.is_production() {
        TracingConfig::production()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = try_init_tracing_with_config(&tracing_config) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        env = ?config.app.env,
        port = config.gateway.port,
        "Configuration loaded"
    );

    // In-memory backing services; deployments swap in storage-backed
    // implementations through `Collaborators`
    let jwt = JwtService::new(&config.jwt.secret, config.jwt.access_token_expiry);
    let collaborators = Collaborators {
        directory: Arc::new(InMemoryChatDirectory::new()),
        messages: Arc::new(InMemoryMessageStore::new()),
        statuses: Arc::new(InMemoryStatusStore::new()),
        verifier: Arc::new(JwtVerifier::new(jwt)),
    };

    relay_gateway::run(config, collaborators).await?;

    Ok(())
}
