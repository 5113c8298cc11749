//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Audit event model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Event type of recorded commands
pub const COMMAND_EVENT: &str = "command";

/// Scalar metadata attached to an event
pub type AuditMeta = BTreeMap<String, serde_json::Value>;

/// One audit record; serialized as a single JSON line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event type
    #[serde(rename = "type")]
    pub event_type: String,

    /// Creation time
    pub ts: DateTime<Utc>,

    /// Acting subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<Uuid>,

    /// Display name of the acting subject
    #[serde(rename = "actorName", default, skip_serializing_if = "Option::is_none")]
    pub actor_name: Option<String>,

    /// Command line or system message, after redaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Additional metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<AuditMeta>,
}

impl AuditEvent {
    /// Event for a command issued by a subject
    pub fn command(
        actor: Option<Uuid>,
        actor_name: Option<String>,
        command: impl Into<String>,
        meta: AuditMeta,
    ) -> Self {
        Self {
            event_type: COMMAND_EVENT.to_string(),
            ts: Utc::now(),
            actor,
            actor_name,
            command: Some(command.into()),
            meta: non_empty(meta),
        }
    }

    /// Event raised by the system itself
    pub fn system(event_type: impl Into<String>, message: impl Into<String>, meta: AuditMeta) -> Self {
        Self {
            event_type: event_type.into(),
            ts: Utc::now(),
            actor: None,
            actor_name: None,
            command: Some(message.into()),
            meta: non_empty(meta),
        }
    }

    /// JSON line without the terminator
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn non_empty(meta: AuditMeta) -> Option<AuditMeta> {
    if meta.is_empty() {
        None
    } else {
        Some(meta)
    }
}
