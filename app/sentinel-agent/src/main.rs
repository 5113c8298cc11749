//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! SentinelCore agent binary

use sentinel_config::SentinelConfig;
use sentinel_core::{init_logging, RuntimeOptions, SentinelRuntime, VERSION};
use std::path::PathBuf;
use tracing::info;

/// Default configuration directory
const DEFAULT_CONFIG_DIR: &str = "config/sentinel";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging; categories are refined once the config is loaded
    let logging = init_logging(&SentinelConfig::default().logging)?;

    info!("Starting SentinelCore agent v{}", VERSION);

    let config_dir = std::env::var("SENTINEL_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR));
    let watch = std::env::var("SENTINEL_WATCH_CONFIG")
        .map(|value| value != "false" && value != "0")
        .unwrap_or(true);

    let options = RuntimeOptions::new(config_dir)
        .with_logging(logging)
        .with_watcher(watch);
    let runtime = SentinelRuntime::init(options).await?;
    info!("SentinelCore agent started");

    shutdown_signal().await;

    runtime.shutdown().await;
    info!("SentinelCore agent shutdown completed");
    Ok(())
}

/// Handle shutdown signals
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }

    info!("Shutdown signal received");
}
