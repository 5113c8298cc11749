//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Role contexts of active subjects
//!
//! Contexts live in a concurrent map keyed by subject. Each setter mutates one
//! entry under the map's per-key lock and then announces the change on a
//! broadcast channel.

use dashmap::DashMap;
use sentinel_config::{CONTEXT_TARGET, DEFAULT_ROLE};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::permissions::{ContextFlags, SubjectId};

/// Context flag mirroring the moderation mode
pub const MODMODE_FLAG: &str = "modmode";

/// Context flag mirroring the visibility state
pub const VANISHED_FLAG: &str = "vanished";

/// Per-subject role context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleContext {
    subject: SubjectId,
    group: String,
    elevated: bool,
    moderation_mode: bool,
    vanished: bool,
    flags: Arc<ContextFlags>,
}

impl RoleContext {
    /// Fresh context in the default group
    pub fn new(subject: SubjectId) -> Self {
        Self {
            subject,
            group: DEFAULT_ROLE.to_string(),
            elevated: false,
            moderation_mode: false,
            vanished: false,
            flags: Arc::new(ContextFlags::new()),
        }
    }

    pub fn subject(&self) -> SubjectId {
        self.subject
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Whether the subject holds platform-level elevated access
    pub fn is_elevated(&self) -> bool {
        self.elevated
    }

    pub fn in_moderation_mode(&self) -> bool {
        self.moderation_mode
    }

    pub fn is_vanished(&self) -> bool {
        self.vanished
    }

    /// Snapshot of the context flags
    pub fn flags(&self) -> Arc<ContextFlags> {
        self.flags.clone()
    }

    pub fn flag(&self, key: &str) -> Option<&str> {
        self.flags.get(key).map(String::as_str)
    }

    fn set_flag(&mut self, key: &str, value: Option<String>) {
        let flags = Arc::make_mut(&mut self.flags);
        match value {
            Some(value) => {
                flags.insert(key.to_string(), value);
            }
            None => {
                flags.remove(key);
            }
        }
    }

    fn set_moderation_mode(&mut self, enabled: bool) {
        self.moderation_mode = enabled;
        self.set_flag(MODMODE_FLAG, Some(enabled.to_string()));
    }

    fn set_vanished(&mut self, vanished: bool) {
        self.vanished = vanished;
        self.set_flag(VANISHED_FLAG, Some(vanished.to_string()));
    }
}

/// Kind of context change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextChangeKind {
    GroupChanged,
    AccessChanged,
    ModeChanged,
    VisibilityChanged,
    FlagChanged,
}

/// Change announced by the context manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextChange {
    pub subject: SubjectId,
    pub kind: ContextChangeKind,
}

/// Role context manager
#[derive(Debug)]
pub struct RoleContextManager {
    /// Contexts of active subjects
    contexts: DashMap<SubjectId, RoleContext>,

    /// Change notifications
    changes: broadcast::Sender<ContextChange>,
}

impl Default for RoleContextManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleContextManager {
    /// Create an empty manager
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            contexts: DashMap::new(),
            changes,
        }
    }

    /// Context of `subject`, created on first access
    pub fn get(&self, subject: &SubjectId) -> RoleContext {
        self.contexts
            .entry(*subject)
            .or_insert_with(|| RoleContext::new(*subject))
            .value()
            .clone()
    }

    /// Context of `subject` without creating one
    pub fn peek(&self, subject: &SubjectId) -> Option<RoleContext> {
        self.contexts.get(subject).map(|context| context.value().clone())
    }

    pub fn set_group(&self, subject: &SubjectId, group: &str) {
        self.mutate(subject, ContextChangeKind::GroupChanged, |context| {
            context.group = group.to_string();
        });
        info!(target: CONTEXT_TARGET, "Context group of {} set to '{}'", subject, group);
    }

    pub fn set_elevated(&self, subject: &SubjectId, elevated: bool) {
        self.mutate(subject, ContextChangeKind::AccessChanged, |context| {
            context.elevated = elevated;
        });
        info!(target: CONTEXT_TARGET, "Elevated access of {} set to {}", subject, elevated);
    }

    pub fn set_moderation_mode(&self, subject: &SubjectId, enabled: bool) {
        self.mutate(subject, ContextChangeKind::ModeChanged, |context| {
            context.set_moderation_mode(enabled);
        });
        info!(target: CONTEXT_TARGET, "Moderation mode of {} set to {}", subject, enabled);
    }

    pub fn set_visibility(&self, subject: &SubjectId, vanished: bool) {
        self.mutate(subject, ContextChangeKind::VisibilityChanged, |context| {
            context.set_vanished(vanished);
        });
        info!(target: CONTEXT_TARGET, "Vanished state of {} set to {}", subject, vanished);
    }

    /// Set a context flag, or remove it when `value` is `None`
    pub fn set_context_flag(&self, subject: &SubjectId, key: &str, value: Option<&str>) {
        self.mutate(subject, ContextChangeKind::FlagChanged, |context| {
            context.set_flag(key, value.map(str::to_string));
        });
        debug!(target: CONTEXT_TARGET, "Context flag {} of {} set to {:?}", key, subject, value);
    }

    /// Drop the context of a departing subject
    pub fn remove(&self, subject: &SubjectId) -> Option<RoleContext> {
        let removed = self.contexts.remove(subject).map(|(_, context)| context);
        if removed.is_some() {
            debug!(target: CONTEXT_TARGET, "Removed context of {}", subject);
        }
        removed
    }

    /// Drop every context
    pub fn clear(&self) {
        let count = self.contexts.len();
        self.contexts.clear();
        info!(target: CONTEXT_TARGET, "Cleared {} role contexts", count);
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Subscribe to context changes
    pub fn subscribe(&self) -> broadcast::Receiver<ContextChange> {
        self.changes.subscribe()
    }

    fn mutate<F>(&self, subject: &SubjectId, kind: ContextChangeKind, mutator: F)
    where
        F: FnOnce(&mut RoleContext),
    {
        {
            let mut context = self
                .contexts
                .entry(*subject)
                .or_insert_with(|| RoleContext::new(*subject));
            mutator(context.value_mut());
        }

        // No subscribers is fine
        let _ = self.changes.send(ContextChange {
            subject: *subject,
            kind,
        });
    }
}
