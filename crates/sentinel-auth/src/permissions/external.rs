//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Permission services delegating to an external authority
//!
//! The bridge forwards every call. The mirror keeps local copies of decisions
//! and group lookups and only asks the authority on a miss.

use dashmap::DashMap;
use sentinel_config::{DEFAULT_ROLE, PERM_TARGET};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::service::{ContextFlags, PermissionService, SubjectId};
use crate::error::AuthResult;

/// Permission authority provided by the host environment
pub trait ExternalAuthority: Send + Sync + Debug {
    /// Authority name for logs
    fn name(&self) -> &str;

    /// Whether the authority can currently answer requests
    fn is_available(&self) -> bool;

    fn check(&self, subject: &SubjectId, node: &str, context: &ContextFlags) -> AuthResult<bool>;

    fn primary_group(&self, subject: &SubjectId) -> AuthResult<String>;

    fn set_primary_group(&self, subject: &SubjectId, group: &str) -> AuthResult<()>;

    fn inherited_groups(&self, subject: &SubjectId) -> AuthResult<Vec<String>>;

    fn group_exists(&self, group: &str) -> AuthResult<bool>;
}

/// Forwards every call to the external authority
#[derive(Debug)]
pub struct BridgePermissionService {
    authority: Arc<dyn ExternalAuthority>,
}

impl BridgePermissionService {
    pub fn new(authority: Arc<dyn ExternalAuthority>) -> Self {
        info!(target: PERM_TARGET, "Bridging permissions to '{}'", authority.name());
        Self { authority }
    }
}

impl PermissionService for BridgePermissionService {
    fn name(&self) -> &'static str {
        "bridge"
    }

    fn check(&self, subject: &SubjectId, node: &str, context: &ContextFlags) -> bool {
        self.authority
            .check(subject, node, context)
            .unwrap_or_else(|e| {
                warn!(target: PERM_TARGET, "Bridge check {} {} failed: {}", subject, node, e);
                false
            })
    }

    fn group(&self, subject: &SubjectId) -> String {
        self.authority.primary_group(subject).unwrap_or_else(|e| {
            warn!(target: PERM_TARGET, "Bridge group lookup for {} failed: {}", subject, e);
            DEFAULT_ROLE.to_string()
        })
    }

    fn set_group(&self, subject: &SubjectId, group: &str) {
        if let Err(e) = self.authority.set_primary_group(subject, group) {
            warn!(target: PERM_TARGET, "Bridge set group {} -> '{}' failed: {}", subject, group, e);
        }
    }

    fn inherited_groups(&self, subject: &SubjectId) -> Vec<String> {
        self.authority.inherited_groups(subject).unwrap_or_else(|e| {
            warn!(target: PERM_TARGET, "Bridge inherited groups for {} failed: {}", subject, e);
            vec![DEFAULT_ROLE.to_string()]
        })
    }

    fn group_exists(&self, group: &str) -> bool {
        self.authority.group_exists(group).unwrap_or_else(|e| {
            warn!(target: PERM_TARGET, "Bridge group lookup '{}' failed: {}", group, e);
            false
        })
    }
}

/// Caches external decisions and group lookups
#[derive(Debug)]
pub struct MirrorPermissionService {
    authority: Arc<dyn ExternalAuthority>,

    /// Decisions keyed by subject and node plus context
    decisions: DashMap<(SubjectId, String), bool>,

    /// Primary groups
    groups: DashMap<SubjectId, String>,

    /// Inherited group lists
    inherited: DashMap<SubjectId, Vec<String>>,
}

impl MirrorPermissionService {
    pub fn new(authority: Arc<dyn ExternalAuthority>) -> Self {
        info!(target: PERM_TARGET, "Mirroring permissions from '{}'", authority.name());
        Self {
            authority,
            decisions: DashMap::new(),
            groups: DashMap::new(),
            inherited: DashMap::new(),
        }
    }

    /// Drop every cached entry
    pub fn invalidate(&self) {
        self.decisions.clear();
        self.groups.clear();
        self.inherited.clear();
        debug!(target: PERM_TARGET, "Mirror cache cleared");
    }

    /// Drop the cached entries of one subject
    pub fn invalidate_subject(&self, subject: &SubjectId) {
        self.decisions.retain(|(cached, _), _| cached != subject);
        self.groups.remove(subject);
        self.inherited.remove(subject);
    }

    /// Number of cached decisions
    pub fn cached_decisions(&self) -> usize {
        self.decisions.len()
    }
}

fn decision_key(node: &str, context: &ContextFlags) -> String {
    let mut key = node.to_ascii_lowercase();
    for (name, value) in context {
        key.push('|');
        key.push_str(name);
        key.push('=');
        key.push_str(value);
    }
    key
}

impl PermissionService for MirrorPermissionService {
    fn name(&self) -> &'static str {
        "mirror"
    }

    fn check(&self, subject: &SubjectId, node: &str, context: &ContextFlags) -> bool {
        let key = (*subject, decision_key(node, context));
        if let Some(cached) = self.decisions.get(&key) {
            return *cached;
        }

        match self.authority.check(subject, node, context) {
            Ok(allowed) => {
                self.decisions.insert(key, allowed);
                allowed
            }
            Err(e) => {
                warn!(target: PERM_TARGET, "Mirror check {} {} failed: {}", subject, node, e);
                false
            }
        }
    }

    fn group(&self, subject: &SubjectId) -> String {
        if let Some(group) = self.groups.get(subject) {
            return group.value().clone();
        }

        match self.authority.primary_group(subject) {
            Ok(group) => {
                self.groups.insert(*subject, group.clone());
                group
            }
            Err(e) => {
                warn!(target: PERM_TARGET, "Mirror group lookup for {} failed: {}", subject, e);
                DEFAULT_ROLE.to_string()
            }
        }
    }

    fn set_group(&self, subject: &SubjectId, group: &str) {
        if let Err(e) = self.authority.set_primary_group(subject, group) {
            warn!(target: PERM_TARGET, "Mirror set group {} -> '{}' failed: {}", subject, group, e);
        }
        self.invalidate_subject(subject);
    }

    fn inherited_groups(&self, subject: &SubjectId) -> Vec<String> {
        if let Some(groups) = self.inherited.get(subject) {
            return groups.value().clone();
        }

        match self.authority.inherited_groups(subject) {
            Ok(groups) => {
                self.inherited.insert(*subject, groups.clone());
                groups
            }
            Err(e) => {
                warn!(target: PERM_TARGET, "Mirror inherited groups for {} failed: {}", subject, e);
                vec![DEFAULT_ROLE.to_string()]
            }
        }
    }

    fn group_exists(&self, group: &str) -> bool {
        self.authority.group_exists(group).unwrap_or(false)
    }
}
