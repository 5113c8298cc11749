//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Audit pipeline
//!
//! Filters an action, builds the event and hands it to every sink in turn.
//! A failing sink is logged and counted; the remaining sinks still run and
//! the caller never sees the error.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sentinel_config::{AuditConfig, AUDIT_TARGET};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AuditResult;
use crate::event::{AuditEvent, AuditMeta};
use crate::file_sink::{FileSinkSettings, JsonlFileSink};
use crate::filter::AuditFilter;
use crate::ledger::LedgerSink;
use crate::sink::AuditSink;
use crate::tail::{self, TailReport};

/// Event type recorded when auditing is switched on
pub const AUDIT_TOGGLE_EVENT: &str = "audit_toggle";

/// What happened to a record request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Auditing is off
    Disabled,

    /// The root command is excluded
    Excluded,

    /// The event reached the sinks
    Recorded {
        /// Sinks that accepted the event
        written: usize,

        /// Sinks that failed
        failed: usize,
    },
}

/// Audit statistics
#[derive(Debug, Clone, Default)]
pub struct AuditStats {
    /// Events dispatched to sinks
    pub events_recorded: u64,

    /// Events dropped by exclusion
    pub events_excluded: u64,

    /// Individual sink write failures
    pub sink_failures: u64,

    /// Last dispatched event
    pub last_event: Option<DateTime<Utc>>,
}

impl AuditStats {
    pub fn increment_recorded(&mut self) {
        self.events_recorded += 1;
        self.last_event = Some(Utc::now());
    }

    pub fn increment_excluded(&mut self) {
        self.events_excluded += 1;
    }

    pub fn add_sink_failures(&mut self, failures: usize) {
        self.sink_failures += failures as u64;
    }
}

/// Audit pipeline
#[derive(Debug)]
pub struct AuditPipeline {
    /// Base for relative audit directories
    base_dir: PathBuf,

    /// Whether recording is on
    enabled: AtomicBool,

    /// `audit.enabled` of the last applied snapshot
    configured_enabled: AtomicBool,

    /// Exclusion and redaction rules
    filter: RwLock<Arc<AuditFilter>>,

    /// Rotating file sink, always installed
    file_sink: Arc<JsonlFileSink>,

    /// Ledger sink while enabled
    ledger: RwLock<Option<Arc<LedgerSink>>>,

    /// Additional sinks supplied by the host
    extra_sinks: RwLock<Vec<Arc<dyn AuditSink>>>,

    /// Statistics
    stats: RwLock<AuditStats>,
}

impl AuditPipeline {
    /// Create a pipeline resolving relative directories against `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>, config: &AuditConfig) -> Self {
        let base_dir = base_dir.into();
        let pipeline = Self {
            file_sink: Arc::new(JsonlFileSink::new(file_settings(&base_dir, config))),
            base_dir,
            enabled: AtomicBool::new(config.enabled),
            configured_enabled: AtomicBool::new(config.enabled),
            filter: RwLock::new(Arc::new(AuditFilter::from_config(config))),
            ledger: RwLock::new(None),
            extra_sinks: RwLock::new(Vec::new()),
            stats: RwLock::new(AuditStats::default()),
        };
        pipeline.configure(config);
        pipeline
    }

    /// Apply a snapshot without touching the filesystem
    ///
    /// The runtime switch only follows `audit.enabled` when that value differs
    /// from the previously applied snapshot, so a toggle survives reloads of
    /// an otherwise unrelated document. Returns the new state when it changed.
    pub fn configure(&self, config: &AuditConfig) -> Option<bool> {
        let previous = self
            .configured_enabled
            .swap(config.enabled, Ordering::SeqCst);
        let switched = if previous != config.enabled
            && self.enabled.swap(config.enabled, Ordering::SeqCst) != config.enabled
        {
            Some(config.enabled)
        } else {
            None
        };

        *self.filter.write() = Arc::new(AuditFilter::from_config(config));
        self.file_sink
            .reconfigure(file_settings(&self.base_dir, config));

        let want_ledger = config.ledger_enabled && LedgerSink::supports_mode(&config.ledger_mode);
        let mut ledger = self.ledger.write();
        match (want_ledger, ledger.is_some()) {
            (true, false) => {
                *ledger = Some(Arc::new(LedgerSink::new()));
                info!(target: AUDIT_TARGET, "Audit ledger sink enabled");
            }
            (false, true) => {
                *ledger = None;
                info!(target: AUDIT_TARGET, "Audit ledger sink disabled");
            }
            _ => {}
        }
        if config.ledger_enabled && !want_ledger {
            warn!(
                target: AUDIT_TARGET,
                "Unsupported audit ledger mode '{}', ledger stays off", config.ledger_mode
            );
        }
        switched
    }

    /// Apply a snapshot and delete expired rotation files
    pub async fn apply_config(&self, config: &AuditConfig) -> AuditResult<usize> {
        if let Some(enabled) = self.configure(config) {
            info!(
                target: AUDIT_TARGET,
                "Audit logging {} by configuration",
                if enabled { "enabled" } else { "disabled" }
            );
            if enabled {
                self.record_toggle(true).await;
            }
        }
        let removed = self.file_sink.cleanup_expired(SystemTime::now()).await?;
        if removed > 0 {
            info!(target: AUDIT_TARGET, "Removed {} expired audit files", removed);
        }
        Ok(removed)
    }

    /// Attach a host-supplied sink
    pub fn add_sink(&self, sink: Arc<dyn AuditSink>) {
        info!(target: AUDIT_TARGET, "Audit sink added: {}", sink.name());
        self.extra_sinks.write().push(sink);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Switch recording on or off
    ///
    /// Switching on records one toggle event; switching off records nothing.
    pub async fn set_enabled(&self, enabled: bool) -> RecordOutcome {
        self.enabled.store(enabled, Ordering::SeqCst);
        info!(target: AUDIT_TARGET, "Audit logging {}", if enabled { "enabled" } else { "disabled" });
        self.record_toggle(enabled).await
    }

    async fn record_toggle(&self, enabled: bool) -> RecordOutcome {
        let mut meta = AuditMeta::new();
        meta.insert("enabled".to_string(), json!(enabled));
        self.record_system_event(
            AUDIT_TOGGLE_EVENT,
            if enabled { "enabled" } else { "disabled" },
            meta,
        )
        .await
    }

    pub fn has_ledger(&self) -> bool {
        self.ledger.read().is_some()
    }

    pub fn file_sink(&self) -> &Arc<JsonlFileSink> {
        &self.file_sink
    }

    /// Directory of the rotation files
    pub fn directory(&self) -> PathBuf {
        self.file_sink.directory()
    }

    pub fn stats(&self) -> AuditStats {
        self.stats.read().clone()
    }

    /// Record a command issued by a subject
    pub async fn record_action(
        &self,
        actor: Option<Uuid>,
        actor_name: Option<&str>,
        raw: &str,
        meta: AuditMeta,
    ) -> RecordOutcome {
        if !self.is_enabled() {
            return RecordOutcome::Disabled;
        }

        let filter = self.filter.read().clone();
        if filter.is_excluded(raw) {
            self.stats.write().increment_excluded();
            debug!(target: AUDIT_TARGET, "Audit skipped excluded command");
            return RecordOutcome::Excluded;
        }

        let event = AuditEvent::command(
            actor,
            actor_name.map(str::to_string),
            filter.redact(raw),
            meta,
        );
        self.dispatch(&event).await
    }

    /// Record an event raised by the system
    pub async fn record_system_event(
        &self,
        event_type: &str,
        message: &str,
        meta: AuditMeta,
    ) -> RecordOutcome {
        if !self.is_enabled() {
            return RecordOutcome::Disabled;
        }

        let filter = self.filter.read().clone();
        let event = AuditEvent::system(event_type, filter.redact(message), meta);
        self.dispatch(&event).await
    }

    /// Last `lines` lines of the latest rotation file
    pub async fn tail(&self, lines: usize) -> AuditResult<TailReport> {
        tail::tail(&self.directory(), lines).await
    }

    fn sinks(&self) -> Vec<Arc<dyn AuditSink>> {
        let mut sinks: Vec<Arc<dyn AuditSink>> = Vec::new();
        sinks.push(self.file_sink.clone());
        if let Some(ledger) = self.ledger.read().as_ref() {
            sinks.push(ledger.clone());
        }
        sinks.extend(self.extra_sinks.read().iter().cloned());
        sinks
    }

    async fn dispatch(&self, event: &AuditEvent) -> RecordOutcome {
        let mut written = 0;
        let mut failed = 0;

        for sink in self.sinks() {
            match sink.write(event).await {
                Ok(()) => written += 1,
                Err(e) => {
                    failed += 1;
                    warn!(target: AUDIT_TARGET, "Audit sink '{}' failed: {}", sink.name(), e);
                }
            }
        }

        {
            let mut stats = self.stats.write();
            stats.increment_recorded();
            stats.add_sink_failures(failed);
        }

        RecordOutcome::Recorded { written, failed }
    }
}

fn file_settings(base_dir: &Path, config: &AuditConfig) -> FileSinkSettings {
    FileSinkSettings {
        directory: config.resolve_directory(base_dir),
        rotation: config.rotation,
        retention_days: config.retention_days,
    }
}
