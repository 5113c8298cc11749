//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Debounced configuration file watcher
//!
//! A `notify` watcher on the configuration directory feeds reload signals into
//! one channel, shared with explicit reload requests. A single task drains the
//! channel, waits for a quiet period and reloads the store.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::categories::CONFIG_TARGET;
use crate::error::{ConfigError, ConfigResult};
use crate::store::{ConfigStore, CONFIG_JSON, CONFIG_YAML};

/// Quiet period before a burst of events triggers a reload
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Why a reload was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadSignal {
    /// The document changed on disk
    FileChanged,

    /// A caller asked for a reload
    Requested,
}

/// Handle to a running watcher task
pub(crate) struct WatcherHandle {
    _watcher: RecommendedWatcher,
    reload_tx: mpsc::UnboundedSender<ReloadSignal>,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    pub(crate) fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub(crate) fn reload_sender(&self) -> mpsc::UnboundedSender<ReloadSignal> {
        self.reload_tx.clone()
    }

    pub(crate) async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            warn!(target: CONFIG_TARGET, "Config watcher task ended abnormally: {}", e);
        }
    }
}

/// Whether a filesystem event concerns the configuration document
pub fn is_relevant(event: &Event) -> bool {
    let kind_matches = matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_));
    kind_matches
        && event.paths.iter().any(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name == CONFIG_YAML || name == CONFIG_JSON)
                .unwrap_or(false)
        })
}

pub(crate) fn spawn(
    store: Weak<ConfigStore>,
    config_dir: &Path,
    debounce: Duration,
) -> ConfigResult<WatcherHandle> {
    let (reload_tx, reload_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let event_tx = reload_tx.clone();
    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        match res {
            Ok(event) => {
                if is_relevant(&event) {
                    let _ = event_tx.send(ReloadSignal::FileChanged);
                }
            }
            Err(e) => warn!(target: CONFIG_TARGET, "Configuration file watch error: {}", e),
        }
    })
    .map_err(|e| ConfigError::watcher(format!("Failed to create file watcher: {}", e)))?;

    watcher
        .watch(config_dir, RecursiveMode::NonRecursive)
        .map_err(|e| ConfigError::watcher(format!("Failed to watch config dir: {}", e)))?;

    let task = tokio::spawn(run(store, reload_rx, shutdown_rx, debounce));

    Ok(WatcherHandle {
        _watcher: watcher,
        reload_tx,
        shutdown_tx,
        task,
    })
}

async fn run(
    store: Weak<ConfigStore>,
    mut reload_rx: mpsc::UnboundedReceiver<ReloadSignal>,
    mut shutdown_rx: broadcast::Receiver<()>,
    debounce: Duration,
) {
    loop {
        let signal = tokio::select! {
            _ = shutdown_rx.recv() => break,
            signal = reload_rx.recv() => match signal {
                Some(signal) => signal,
                None => break,
            },
        };
        debug!(target: CONFIG_TARGET, "Reload signal received: {:?}", signal);

        // Every further signal restarts the quiet period
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => return,
                _ = tokio::time::sleep(debounce) => break,
                next = reload_rx.recv() => {
                    if next.is_none() {
                        return;
                    }
                }
            }
        }

        let Some(store) = store.upgrade() else {
            break;
        };
        if let Err(e) = store.reload_if_changed().await {
            error!(target: CONFIG_TARGET, "Failed to reload config: {}", e);
        }
    }

    info!(target: CONFIG_TARGET, "Config watcher exiting");
}
