//! Shopping list demo server.
//!
//! Serves `./assets` on port 8000 and the `backend` object over WebSocket on
//! port 8001. Stops on Ctrl+C.
//!
//! Set `RUST_LOG` to override the default `webchannel=info` filter.

// ============================================================================
// Imports
// ============================================================================

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use webchannel::{Demo, DemoConfig};

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_FILTER: &str = "webchannel=info";

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let handle = match DemoConfig::builder().build() {
        Ok(config) => match Demo::start(config).await {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Failed to start");
                return ExitCode::FAILURE;
            }
        },
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
    }

    info!("Interrupted");
    handle.shutdown().await;

    ExitCode::SUCCESS
}

/// Installs the fmt subscriber, honoring `RUST_LOG`.
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
