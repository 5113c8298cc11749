//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Administrative operations
//!
//! Every operation is gated by a permission node, reports an
//! [`AdminOutcome`] and leaves an audit record once it was allowed to run.

use sentinel_audit::{AuditMeta, AuditPipeline, DEFAULT_TAIL_LINES};
use sentinel_auth::{PermissionFacade, SubjectId};
use sentinel_config::ConfigStore;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::host::HostRuntime;

/// Node required to switch auditing on or off
pub const AUDIT_TOGGLE_NODE: &str = "sentinelcore.audit.toggle";

/// Node required to read the audit trail
pub const AUDIT_TAIL_NODE: &str = "sentinelcore.audit.tail";

/// Node required for configuration and role administration
pub const ADMIN_NODE: &str = "sentinelcore.admin";

/// Message returned when the invoker lacks the required node
pub const PERMISSION_DENIED: &str = "You do not have permission to do that.";

/// Who issued an administrative operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invoker {
    /// The host console; always allowed
    Console,

    /// A connected subject
    Subject { id: SubjectId, name: String },
}

impl Invoker {
    pub fn subject(id: SubjectId, name: impl Into<String>) -> Self {
        Invoker::Subject {
            id,
            name: name.into(),
        }
    }

    fn id(&self) -> Option<SubjectId> {
        match self {
            Invoker::Console => None,
            Invoker::Subject { id, .. } => Some(*id),
        }
    }

    fn name(&self) -> &str {
        match self {
            Invoker::Console => "console",
            Invoker::Subject { name, .. } => name,
        }
    }
}

impl fmt::Display for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invoker::Console => write!(f, "console"),
            Invoker::Subject { id, name } => write!(f, "{} ({})", name, id),
        }
    }
}

/// Result of an administrative operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminOutcome {
    /// Whether the operation succeeded
    pub success: bool,

    /// Feedback for the invoker
    pub message: String,

    /// Extra output lines, such as tailed audit records
    pub details: Vec<String>,
}

impl AdminOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: Vec::new(),
        }
    }

    fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }
}

/// Administrative operations
#[derive(Debug, Clone)]
pub struct AdminCommands {
    store: Arc<ConfigStore>,
    facade: Arc<PermissionFacade>,
    audit: Arc<AuditPipeline>,
    host: Arc<dyn HostRuntime>,
}

impl AdminCommands {
    pub fn new(
        store: Arc<ConfigStore>,
        facade: Arc<PermissionFacade>,
        audit: Arc<AuditPipeline>,
        host: Arc<dyn HostRuntime>,
    ) -> Self {
        Self {
            store,
            facade,
            audit,
            host,
        }
    }

    /// Whether `invoker` may run operations gated by `node`
    pub fn may_administer(&self, invoker: &Invoker, node: &str) -> bool {
        match invoker {
            Invoker::Console => true,
            Invoker::Subject { id, .. } => {
                self.facade.authorized_in_context(id, node) || self.host.is_platform_privileged(id)
            }
        }
    }

    /// Switch audit recording on or off
    ///
    /// Switching on leaves exactly one `audit_toggle` record.
    pub async fn toggle_audit(&self, invoker: &Invoker, enabled: bool) -> AdminOutcome {
        if !self.may_administer(invoker, AUDIT_TOGGLE_NODE) {
            return AdminOutcome::failure(PERMISSION_DENIED);
        }

        self.audit.set_enabled(enabled).await;
        let state = if enabled { "enabled" } else { "disabled" };
        info!("Audit logging {} by {}", state, invoker);
        AdminOutcome::success(format!("Audit logging {}.", state))
    }

    /// Last `lines` audit records, 20 when `None`
    pub async fn tail_audit(&self, invoker: &Invoker, lines: Option<usize>) -> AdminOutcome {
        if !self.may_administer(invoker, AUDIT_TAIL_NODE) {
            return AdminOutcome::failure(PERMISSION_DENIED);
        }

        let lines = lines.unwrap_or(DEFAULT_TAIL_LINES);
        let outcome = match self.audit.tail(lines).await {
            Ok(report) => AdminOutcome::success(report.summary).with_details(report.lines),
            Err(e) => {
                warn!("Audit tail failed: {}", e);
                AdminOutcome::failure(format!("Failed to read audit logs: {}", e))
            }
        };

        self.record(invoker, &format!("/sclogs tail {}", lines), &outcome)
            .await;
        outcome
    }

    /// Re-read the configuration document
    pub async fn reload_config(&self, invoker: &Invoker) -> AdminOutcome {
        if !self.may_administer(invoker, ADMIN_NODE) {
            return AdminOutcome::failure(PERMISSION_DENIED);
        }

        let outcome = match self.store.reload().await {
            Ok(_) => AdminOutcome::success("Config reloaded."),
            Err(e) => AdminOutcome::failure(format!("Config reload failed: {}", e)),
        };

        self.record(invoker, "/sccore reload", &outcome).await;
        outcome
    }

    /// Assign `role` to `subject` and persist it
    ///
    /// Unknown roles are refused and nothing changes.
    pub async fn assign_role(
        &self,
        invoker: &Invoker,
        subject: SubjectId,
        role: &str,
    ) -> AdminOutcome {
        if !self.may_administer(invoker, ADMIN_NODE) {
            return AdminOutcome::failure(PERMISSION_DENIED);
        }

        let command = format!("/sccore setrole {} {}", subject, role);
        if !self.facade.group_exists(role) {
            let outcome = AdminOutcome::failure(format!("Unknown role '{}'.", role));
            self.record(invoker, &command, &outcome).await;
            return outcome;
        }

        let persisted = self
            .store
            .update(|config| {
                config
                    .permissions
                    .user_roles
                    .insert(subject.to_string(), role.to_string());
            })
            .await;

        let outcome = match persisted {
            Ok(_) => {
                self.facade.set_group(&subject, role);
                AdminOutcome::success(format!("Assigned role '{}' to {}.", role, subject))
            }
            Err(e) => AdminOutcome::failure(format!("Failed to save role assignment: {}", e)),
        };

        self.record(invoker, &command, &outcome).await;
        outcome
    }

    /// Report whether `subject` holds `node`
    pub async fn test_permission(
        &self,
        invoker: &Invoker,
        subject: SubjectId,
        node: &str,
    ) -> AdminOutcome {
        if !self.may_administer(invoker, ADMIN_NODE) {
            return AdminOutcome::failure(PERMISSION_DENIED);
        }

        let allowed = self.facade.authorized_in_context(&subject, node);
        let outcome = AdminOutcome::success(format!("{} has {}: {}", subject, node, allowed));
        self.record(invoker, &format!("/sccore test {} {}", subject, node), &outcome)
            .await;
        outcome
    }

    async fn record(&self, invoker: &Invoker, command: &str, outcome: &AdminOutcome) {
        let mut meta = AuditMeta::new();
        meta.insert("success".to_string(), json!(outcome.success));
        self.audit
            .record_action(invoker.id(), Some(invoker.name()), command, meta)
            .await;
    }
}
