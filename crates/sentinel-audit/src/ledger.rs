//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Ledger sink mirroring events into the structured log stream

use async_trait::async_trait;
use tracing::info;

use crate::error::AuditResult;
use crate::event::AuditEvent;
use crate::sink::AuditSink;

/// Tracing target of ledger records
pub const LEDGER_TARGET: &str = "sentinel::audit::ledger";

/// Ledger mode writing through `tracing`
pub const LOGGER_MODE: &str = "logger";

/// Writes each event as one log record
#[derive(Debug, Default)]
pub struct LedgerSink;

impl LedgerSink {
    pub fn new() -> Self {
        Self
    }

    /// Whether a configured mode is served by this sink
    pub fn supports_mode(mode: &str) -> bool {
        let mode = mode.trim();
        mode.is_empty() || mode.eq_ignore_ascii_case(LOGGER_MODE)
    }
}

#[async_trait]
impl AuditSink for LedgerSink {
    fn name(&self) -> &str {
        "ledger"
    }

    async fn write(&self, event: &AuditEvent) -> AuditResult<()> {
        let line = event.to_json_line()?;
        info!(target: LEDGER_TARGET, "{}", line);
        Ok(())
    }
}
