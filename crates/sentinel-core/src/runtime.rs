//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! SentinelCore runtime
//!
//! Owns every component and wires the configuration store to them. Created
//! with [`SentinelRuntime::init`] and torn down with
//! [`SentinelRuntime::shutdown`]; components receive their collaborators
//! explicitly instead of reaching for globals.

use sentinel_audit::AuditPipeline;
use sentinel_auth::{
    ExternalAuthority, PermissionFacade, PermissionRegistry, RoleContext, RoleContextManager,
    SubjectId,
};
use sentinel_config::{ConfigStore, FeatureFlags, SentinelConfig, CONTEXT_TARGET};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::admin::AdminCommands;
use crate::error::RuntimeResult;
use crate::host::{HostRuntime, StandaloneHost};
use crate::telemetry::LoggingHandle;

/// Runtime construction options
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Directory holding `config.yaml` or `config.json`
    pub config_dir: PathBuf,

    /// External permission authority, if the host has one
    pub authority: Option<Arc<dyn ExternalAuthority>>,

    /// Host environment
    pub host: Arc<dyn HostRuntime>,

    /// Filter handle refreshed with the logging section
    pub logging: Option<LoggingHandle>,

    /// Whether to watch the configuration directory
    pub watch_config: bool,
}

impl RuntimeOptions {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            authority: None,
            host: Arc::new(StandaloneHost),
            logging: None,
            watch_config: true,
        }
    }

    pub fn with_authority(mut self, authority: Arc<dyn ExternalAuthority>) -> Self {
        self.authority = Some(authority);
        self
    }

    pub fn with_host(mut self, host: Arc<dyn HostRuntime>) -> Self {
        self.host = host;
        self
    }

    pub fn with_logging(mut self, logging: LoggingHandle) -> Self {
        self.logging = Some(logging);
        self
    }

    pub fn with_watcher(mut self, watch_config: bool) -> Self {
        self.watch_config = watch_config;
        self
    }
}

/// SentinelCore runtime
#[derive(Debug)]
pub struct SentinelRuntime {
    store: Arc<ConfigStore>,
    registry: Arc<PermissionRegistry>,
    contexts: Arc<RoleContextManager>,
    facade: Arc<PermissionFacade>,
    audit: Arc<AuditPipeline>,
    flags: Arc<FeatureFlags>,
    host: Arc<dyn HostRuntime>,
    shutdown_tx: broadcast::Sender<()>,
    audit_task: Mutex<Option<JoinHandle<()>>>,
}

impl SentinelRuntime {
    /// Open the configuration and start every component
    pub async fn init(options: RuntimeOptions) -> RuntimeResult<Self> {
        let store = Arc::new(ConfigStore::open(&options.config_dir).await?);
        let snapshot = store.current();

        let registry = Arc::new(PermissionRegistry::new(options.authority.clone()));
        let contexts = Arc::new(RoleContextManager::new());
        let facade = Arc::new(PermissionFacade::new(registry.clone(), contexts.clone()));
        let flags = Arc::new(FeatureFlags::new());

        let audit = Arc::new(AuditPipeline::new(
            audit_base_dir(store.config_dir()),
            &snapshot.audit,
        ));
        if let Err(e) = audit.apply_config(&snapshot.audit).await {
            warn!("Audit retention cleanup failed: {}", e);
        }

        // Subscribe before registering listeners so no snapshot is missed
        let changes = store.subscribe();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let audit_task = tokio::spawn(follow_audit_config(
            audit.clone(),
            store.clone(),
            changes,
            shutdown_rx,
        ));

        {
            let registry = registry.clone();
            let facade = facade.clone();
            store.on_change("permissions", move |config| {
                registry.apply_config(&config.permissions);
                facade.apply_config(&config.permissions);
                Ok(())
            });
        }
        {
            let flags = flags.clone();
            store.on_change("feature-flags", move |config| {
                flags.apply_config(config);
                Ok(())
            });
        }
        if let Some(logging) = options.logging.clone() {
            store.on_change("log-categories", move |config| {
                logging.apply(&config.logging).map_err(Into::into)
            });
        }

        if options.watch_config {
            store.start_watcher().await?;
        }

        info!(
            "SentinelCore runtime started (config: {}, permission backend: {})",
            store.file_in_use().display(),
            registry
                .active_kind()
                .map(|kind| kind.to_string())
                .unwrap_or_else(|| "none".to_string())
        );

        Ok(Self {
            store,
            registry,
            contexts,
            facade,
            audit,
            flags,
            host: options.host,
            shutdown_tx,
            audit_task: Mutex::new(Some(audit_task)),
        })
    }

    /// Stop background tasks and drop every role context
    pub async fn shutdown(&self) {
        info!("Shutting down SentinelCore runtime");
        self.store.stop_watcher().await;

        let _ = self.shutdown_tx.send(());
        if let Some(task) = self.audit_task.lock().await.take() {
            if let Err(e) = task.await {
                warn!("Audit config task ended abnormally: {}", e);
            }
        }

        self.contexts.clear();
        info!("SentinelCore runtime shutdown completed");
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Latest configuration snapshot
    pub fn config(&self) -> Arc<SentinelConfig> {
        self.store.current()
    }

    pub fn registry(&self) -> &Arc<PermissionRegistry> {
        &self.registry
    }

    pub fn contexts(&self) -> &Arc<RoleContextManager> {
        &self.contexts
    }

    pub fn permissions(&self) -> &Arc<PermissionFacade> {
        &self.facade
    }

    pub fn audit(&self) -> &Arc<AuditPipeline> {
        &self.audit
    }

    pub fn flags(&self) -> &Arc<FeatureFlags> {
        &self.flags
    }

    pub fn host(&self) -> &Arc<dyn HostRuntime> {
        &self.host
    }

    /// Administrative operations bound to this runtime
    pub fn admin(&self) -> AdminCommands {
        AdminCommands::new(
            self.store.clone(),
            self.facade.clone(),
            self.audit.clone(),
            self.host.clone(),
        )
    }

    /// Set up the context of a subject that just connected
    pub fn on_subject_connect(&self, subject: SubjectId, display_name: &str) -> RoleContext {
        let group = self.facade.group(&subject);
        let elevated = self.host.is_platform_privileged(&subject);
        self.contexts.set_group(&subject, &group);
        self.contexts.set_elevated(&subject, elevated);

        info!(
            target: CONTEXT_TARGET,
            "{} ({}) connected with group '{}' elevated={}", display_name, subject, group, elevated
        );
        self.contexts.get(&subject)
    }

    /// Drop the context and cached lookups of a subject that left
    pub fn on_subject_disconnect(&self, subject: &SubjectId) {
        self.registry.invalidate_subject(subject);
        if self.contexts.remove(subject).is_some() {
            info!(target: CONTEXT_TARGET, "{} disconnected", subject);
        }
    }

    /// The external authority recalculated `subject`
    ///
    /// Cached lookups are dropped and a connected subject's context picks up
    /// the group the authority now reports.
    pub fn on_authority_update(&self, subject: &SubjectId) {
        self.registry.invalidate_subject(subject);
        if self.contexts.peek(subject).is_some() {
            let group = self.facade.group(subject);
            self.contexts.set_group(subject, &group);
            debug!(target: CONTEXT_TARGET, "{} recalculated with group '{}'", subject, group);
        }
    }
}

/// Relative audit directories resolve against the parent of the config dir
fn audit_base_dir(config_dir: &Path) -> PathBuf {
    match config_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => config_dir.to_path_buf(),
    }
}

async fn follow_audit_config(
    audit: Arc<AuditPipeline>,
    store: Arc<ConfigStore>,
    mut changes: broadcast::Receiver<Arc<SentinelConfig>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        let snapshot = tokio::select! {
            _ = shutdown_rx.recv() => break,
            change = changes.recv() => match change {
                Ok(snapshot) => snapshot,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Audit config follower skipped {} snapshots", skipped);
                    store.current()
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };

        if let Err(e) = audit.apply_config(&snapshot.audit).await {
            warn!("Failed to apply audit config: {}", e);
        }
    }
}
