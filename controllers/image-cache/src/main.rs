//! Image Cache Controller
//!
//! Keeps an `Image` cache hint for every distinct container image referenced
//! by pod-bearing resources (Deployments, ReplicaSets, StatefulSets, ...):
//! - one `Image` per image, scoped to the parent's current generation
//! - Images of older generations are garbage collected on every reconcile
//! - caching can be forced on or off per resource with an annotation
//!
//! Any number of parent kinds can be watched from one process.

mod backoff;
mod config;
mod controller;
mod error;
mod labels;
mod policy;
mod reconciler;
mod resources;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::Config;
use crate::controller::Controller;
use crate::error::ControllerError;
use clap::Parser;
use futures::FutureExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Image Cache Controller");

    // Load configuration from flags, falling back to environment variables
    let config = Config::parse();
    config.validate()?;
    config.log();

    // One broadcast shutdown future shared by every controller
    let shutdown = shutdown_signal().boxed().shared();

    // Initialize and run controller
    let controller = Controller::new(&config, shutdown).await?;
    controller.run().await?;

    info!("Image Cache Controller stopped");
    Ok(())
}

/// Resolves on the first SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("Shutdown signal received, draining in-flight reconciles");
}
