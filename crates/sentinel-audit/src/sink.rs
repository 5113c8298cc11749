//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Audit sink trait

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::AuditResult;
use crate::event::AuditEvent;

/// Destination for audit events
#[async_trait]
pub trait AuditSink: Send + Sync + Debug {
    /// Sink name for logs
    fn name(&self) -> &str;

    /// Persist one event
    async fn write(&self, event: &AuditEvent) -> AuditResult<()>;
}
