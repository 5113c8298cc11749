//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Configuration store
//!
//! Holds the current [`SentinelConfig`] snapshot behind a single reference
//! cell. Readers clone the `Arc` and never see a partially built document;
//! reloads parse into a fresh value and swap it in one step. Every new
//! snapshot is fanned out to registered listeners and broadcast subscribers.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex as SyncMutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::categories::CONFIG_TARGET;
use crate::error::{ConfigError, ConfigResult};
use crate::model::SentinelConfig;
use crate::watcher::{self, ReloadSignal, WatcherHandle, DEFAULT_DEBOUNCE};

/// Preferred configuration file name
pub const CONFIG_YAML: &str = "config.yaml";

/// Alternative configuration file name
pub const CONFIG_JSON: &str = "config.json";

/// Result returned by change listeners
pub type ListenerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Callback invoked with every new snapshot
pub type ConfigListener = Arc<dyn Fn(&Arc<SentinelConfig>) -> ListenerResult + Send + Sync>;

/// Reload statistics
#[derive(Debug, Clone, Default)]
pub struct ReloadStats {
    /// Number of successful reloads
    pub successful_reloads: u64,

    /// Number of failed reloads
    pub failed_reloads: u64,

    /// Number of listener failures
    pub listener_failures: u64,

    /// Last successful reload
    pub last_reload: Option<DateTime<Utc>>,
}

/// Configuration store
pub struct ConfigStore {
    config_dir: PathBuf,
    current: RwLock<Arc<SentinelConfig>>,
    listeners: RwLock<Vec<(String, ConfigListener)>>,
    changes: broadcast::Sender<Arc<SentinelConfig>>,
    write_lock: Mutex<()>,
    watcher: Mutex<Option<WatcherHandle>>,
    reload_tx: SyncMutex<Option<mpsc::UnboundedSender<ReloadSignal>>>,
    stats: RwLock<ReloadStats>,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("config_dir", &self.config_dir)
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl ConfigStore {
    /// Open the store rooted at `config_dir`
    ///
    /// Writes a default `config.yaml` when no document exists yet. A document
    /// that fails to load on startup is replaced by the defaults in memory.
    pub async fn open(config_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        let config_dir = config_dir.into();
        fs::create_dir_all(&config_dir)
            .await
            .map_err(|e| ConfigError::io(&config_dir, e))?;

        let yaml = config_dir.join(CONFIG_YAML);
        let json = config_dir.join(CONFIG_JSON);
        if !yaml.exists() && !json.exists() {
            persist_document(&yaml, &SentinelConfig::default()).await?;
            info!(target: CONFIG_TARGET, "Created default config at {}", yaml.display());
        }

        let path = file_in_use(&config_dir);
        let config = match load_document(&path).await {
            Ok(config) => {
                info!(
                    target: CONFIG_TARGET,
                    "Loaded config: {} feature_flags={:?}",
                    path.display(),
                    config.feature_flags.keys().collect::<Vec<_>>()
                );
                config
            }
            Err(e) => {
                error!(target: CONFIG_TARGET, "Failed to load config, using defaults: {}", e);
                SentinelConfig::default()
            }
        };
        log_validation(&config);

        Ok(Self::with_config(config_dir, config))
    }

    /// Create a store around an in-memory document without touching disk
    pub fn with_config(config_dir: impl Into<PathBuf>, config: SentinelConfig) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            config_dir: config_dir.into(),
            current: RwLock::new(Arc::new(config)),
            listeners: RwLock::new(Vec::new()),
            changes,
            write_lock: Mutex::new(()),
            watcher: Mutex::new(None),
            reload_tx: SyncMutex::new(None),
            stats: RwLock::new(ReloadStats::default()),
        }
    }

    /// Directory holding the configuration document
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of the document currently in use
    pub fn file_in_use(&self) -> PathBuf {
        file_in_use(&self.config_dir)
    }

    /// Latest snapshot
    pub fn current(&self) -> Arc<SentinelConfig> {
        self.current.read().clone()
    }

    /// Reload statistics
    pub fn stats(&self) -> ReloadStats {
        self.stats.read().clone()
    }

    /// Re-read the document and swap the snapshot
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn reload(&self) -> ConfigResult<Arc<SentinelConfig>> {
        let _guard = self.write_lock.lock().await;
        self.reload_locked(true).await
    }

    /// Reload only notifying when the document changed; used by the watcher
    pub(crate) async fn reload_if_changed(&self) -> ConfigResult<Arc<SentinelConfig>> {
        let _guard = self.write_lock.lock().await;
        self.reload_locked(false).await
    }

    async fn reload_locked(&self, always_notify: bool) -> ConfigResult<Arc<SentinelConfig>> {
        let path = self.file_in_use();
        let config = match load_document(&path).await {
            Ok(config) => config,
            Err(e) => {
                self.stats.write().failed_reloads += 1;
                error!(target: CONFIG_TARGET, "Config reload failed: {}", e);
                return Err(e);
            }
        };

        if !always_notify && *self.current() == config {
            debug!(target: CONFIG_TARGET, "Config unchanged on disk, skipping reload");
            return Ok(self.current());
        }

        log_validation(&config);
        let snapshot = self.install(config);
        info!(target: CONFIG_TARGET, "Config reloaded from {}", path.display());
        Ok(snapshot)
    }

    /// Apply `mutator` to a copy of the snapshot, persist it and swap it in
    pub async fn update<F>(&self, mutator: F) -> ConfigResult<Arc<SentinelConfig>>
    where
        F: FnOnce(&mut SentinelConfig),
    {
        let _guard = self.write_lock.lock().await;
        let mut config = (*self.current()).clone();
        mutator(&mut config);

        persist_document(&self.file_in_use(), &config).await?;
        Ok(self.install(config))
    }

    /// Persist the current snapshot to the document in use
    pub async fn save(&self) -> ConfigResult<()> {
        let _guard = self.write_lock.lock().await;
        persist_document(&self.file_in_use(), &self.current()).await
    }

    /// Register a listener and invoke it with the current snapshot
    pub fn on_change<F>(&self, name: impl Into<String>, listener: F)
    where
        F: Fn(&Arc<SentinelConfig>) -> ListenerResult + Send + Sync + 'static,
    {
        let name = name.into();
        let listener: ConfigListener = Arc::new(listener);
        self.listeners.write().push((name.clone(), listener.clone()));

        let snapshot = self.current();
        self.invoke_listener(&name, &listener, &snapshot);
    }

    /// Subscribe to snapshots published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<SentinelConfig>> {
        self.changes.subscribe()
    }

    /// Start the background file watcher; a second call is a no-op
    pub async fn start_watcher(self: &Arc<Self>) -> ConfigResult<()> {
        let mut watcher = self.watcher.lock().await;
        if let Some(handle) = watcher.as_ref() {
            if handle.is_running() {
                debug!(target: CONFIG_TARGET, "Config watcher already running");
                return Ok(());
            }
        }

        let handle = watcher::spawn(Arc::downgrade(self), &self.config_dir, DEFAULT_DEBOUNCE)?;
        *self.reload_tx.lock() = Some(handle.reload_sender());
        *watcher = Some(handle);
        info!(
            target: CONFIG_TARGET,
            "Watching {} for changes",
            self.config_dir.display()
        );
        Ok(())
    }

    /// Stop the background watcher and wait for it to exit
    pub async fn stop_watcher(&self) {
        self.reload_tx.lock().take();
        let handle = self.watcher.lock().await.take();
        if let Some(handle) = handle {
            handle.shutdown().await;
            info!(target: CONFIG_TARGET, "Config watcher stopped");
        }
    }

    /// Whether the watcher task is alive
    pub async fn watcher_running(&self) -> bool {
        self.watcher
            .lock()
            .await
            .as_ref()
            .map(WatcherHandle::is_running)
            .unwrap_or(false)
    }

    /// Queue a debounced reload through the watcher
    ///
    /// Returns `false` when no watcher is running.
    pub fn request_reload(&self) -> bool {
        match self.reload_tx.lock().as_ref() {
            Some(tx) => tx.send(ReloadSignal::Requested).is_ok(),
            None => false,
        }
    }

    fn install(&self, config: SentinelConfig) -> Arc<SentinelConfig> {
        let snapshot = Arc::new(config);
        *self.current.write() = snapshot.clone();
        {
            let mut stats = self.stats.write();
            stats.successful_reloads += 1;
            stats.last_reload = Some(Utc::now());
        }

        self.notify(&snapshot);
        snapshot
    }

    fn notify(&self, snapshot: &Arc<SentinelConfig>) {
        let listeners = self.listeners.read().clone();
        for (name, listener) in &listeners {
            self.invoke_listener(name, listener, snapshot);
        }

        // No subscribers is fine
        let _ = self.changes.send(snapshot.clone());
    }

    fn invoke_listener(&self, name: &str, listener: &ConfigListener, snapshot: &Arc<SentinelConfig>) {
        match catch_unwind(AssertUnwindSafe(|| listener(snapshot))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.stats.write().listener_failures += 1;
                error!(target: CONFIG_TARGET, "Reload listener '{}' failed: {}", name, e);
            }
            Err(_) => {
                self.stats.write().listener_failures += 1;
                error!(target: CONFIG_TARGET, "Reload listener '{}' panicked", name);
            }
        }
    }
}

/// Document in use: `config.yaml` when present, otherwise `config.json`
pub fn file_in_use(config_dir: &Path) -> PathBuf {
    let yaml = config_dir.join(CONFIG_YAML);
    if yaml.exists() {
        yaml
    } else {
        config_dir.join(CONFIG_JSON)
    }
}

/// Load a document, choosing the format by extension
pub async fn load_document(path: &Path) -> ConfigResult<SentinelConfig> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::io(path, e))?;

    match extension(path).as_deref() {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).map_err(|e| ConfigError::parse(path, e.to_string()))
        }
        Some("json") => {
            serde_json::from_str(&content).map_err(|e| ConfigError::parse(path, e.to_string()))
        }
        _ => Err(ConfigError::unsupported_format(path)),
    }
}

/// Persist a document, choosing the format by extension
///
/// Writes to a sibling temporary file and renames it over the target so
/// readers never observe a truncated document.
pub async fn persist_document(path: &Path, config: &SentinelConfig) -> ConfigResult<()> {
    let content = match extension(path).as_deref() {
        Some("yaml") | Some("yml") => {
            serde_yaml::to_string(config).map_err(|e| ConfigError::serialize(e.to_string()))?
        }
        Some("json") => serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::serialize(e.to_string()))?,
        _ => return Err(ConfigError::unsupported_format(path)),
    };

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content)
        .await
        .map_err(|e| ConfigError::io(&tmp, e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| ConfigError::io(path, e))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn log_validation(config: &SentinelConfig) {
    for warning in config.validate() {
        warn!(target: CONFIG_TARGET, "Config warning: {}", warning);
    }
}
