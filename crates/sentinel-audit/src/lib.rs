//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Audit trail for SentinelCore
//!
//! Administrative actions are filtered (exclusion, redaction) and fanned out
//! to a rotating JSONL file sink, an optional ledger sink writing through
//! `tracing`, and any sink the host adds. Rotation files are pruned by age
//! and can be read back with [`tail`].

pub mod error;
pub mod event;
pub mod file_sink;
pub mod filter;
pub mod ledger;
pub mod pipeline;
pub mod sink;
pub mod tail;

// Re-export commonly used types
pub use error::{AuditError, AuditResult};
pub use event::{AuditEvent, AuditMeta, COMMAND_EVENT};
pub use file_sink::{rotation_file_name, FileSinkSettings, JsonlFileSink};
pub use filter::{root_token, AuditFilter};
pub use ledger::{LedgerSink, LEDGER_TARGET};
pub use pipeline::{AuditPipeline, AuditStats, RecordOutcome, AUDIT_TOGGLE_EVENT};
pub use sink::AuditSink;
pub use tail::{tail, TailReport, DEFAULT_TAIL_LINES, MAX_TAIL_LINES, NO_LOGS_SUMMARY};
