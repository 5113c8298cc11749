//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Rotating JSONL file sink
//!
//! Events are appended to `audit-<date>.jsonl` in the configured directory,
//! one file per rotation period in UTC. Appends are serialized through one
//! async mutex so records keep the order of the calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sentinel_config::{RotationPolicy, AUDIT_TARGET};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{AuditError, AuditResult};
use crate::event::AuditEvent;
use crate::sink::AuditSink;

const FILE_PREFIX: &str = "audit-";
const FILE_SUFFIX: &str = ".jsonl";
const SECONDS_PER_DAY: u64 = 86_400;

/// Rotation file name for an instant
pub fn rotation_file_name(rotation: RotationPolicy, ts: DateTime<Utc>) -> String {
    let stamp = match rotation {
        RotationPolicy::Daily => ts.format("%Y-%m-%d"),
        RotationPolicy::Hourly => ts.format("%Y-%m-%dT%H"),
    };
    format!("{}{}{}", FILE_PREFIX, stamp, FILE_SUFFIX)
}

/// Whether a file name looks like a rotation file
pub fn is_rotation_file(name: &str) -> bool {
    name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX)
}

/// File sink settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSinkSettings {
    /// Directory holding rotation files
    pub directory: PathBuf,

    /// Rotation period
    pub rotation: RotationPolicy,

    /// Days to keep files; zero or negative keeps them forever
    pub retention_days: i64,
}

impl FileSinkSettings {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            rotation: RotationPolicy::Daily,
            retention_days: 30,
        }
    }
}

/// Rotating JSONL file sink
#[derive(Debug)]
pub struct JsonlFileSink {
    settings: RwLock<FileSinkSettings>,
    write_lock: Mutex<()>,
}

impl JsonlFileSink {
    pub fn new(settings: FileSinkSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
            write_lock: Mutex::new(()),
        }
    }

    /// Replace the settings; later writes use the new directory and rotation
    pub fn reconfigure(&self, settings: FileSinkSettings) {
        let mut current = self.settings.write();
        if *current != settings {
            debug!(target: AUDIT_TARGET, "Audit file sink reconfigured: {:?}", settings);
            *current = settings;
        }
    }

    pub fn settings(&self) -> FileSinkSettings {
        self.settings.read().clone()
    }

    pub fn directory(&self) -> PathBuf {
        self.settings.read().directory.clone()
    }

    /// File an event stamped `ts` is written to
    pub fn path_for(&self, ts: DateTime<Utc>) -> PathBuf {
        let settings = self.settings.read();
        settings
            .directory
            .join(rotation_file_name(settings.rotation, ts))
    }

    /// Delete rotation files last modified strictly before `now` minus the
    /// retention period; returns how many were removed
    pub async fn cleanup_expired(&self, now: SystemTime) -> AuditResult<usize> {
        let settings = self.settings();
        if settings.retention_days <= 0 {
            return Ok(0);
        }

        // Periods past the representable range keep every file
        let Some(cutoff) = (settings.retention_days as u64)
            .checked_mul(SECONDS_PER_DAY)
            .and_then(|secs| now.checked_sub(Duration::from_secs(secs)))
        else {
            return Ok(0);
        };

        let mut entries = match fs::read_dir(&settings.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(AuditError::io(&settings.directory, e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AuditError::io(&settings.directory, e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !is_rotation_file(name) {
                continue;
            }

            let path = entry.path();
            let modified = match entry.metadata().await.and_then(|meta| meta.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(target: AUDIT_TARGET, "Cannot read mtime of {}: {}", path.display(), e);
                    continue;
                }
            };

            if modified < cutoff {
                match fs::remove_file(&path).await {
                    Ok(()) => {
                        removed += 1;
                        info!(target: AUDIT_TARGET, "Deleted expired audit file {}", path.display());
                    }
                    Err(e) => {
                        warn!(target: AUDIT_TARGET, "Failed to delete {}: {}", path.display(), e)
                    }
                }
            }
        }

        Ok(removed)
    }
}

#[async_trait]
impl AuditSink for JsonlFileSink {
    fn name(&self) -> &str {
        "jsonl-file"
    }

    async fn write(&self, event: &AuditEvent) -> AuditResult<()> {
        let mut line = event.to_json_line()?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let path = self.path_for(event.ts);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AuditError::io(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AuditError::io(&path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| AuditError::io(&path, e))?;
        file.flush().await.map_err(|e| AuditError::io(&path, e))
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
