//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Permission facade
//!
//! Entry point for permission questions. Consults the active service first;
//! subjects with elevated access pass any node that carries none of the
//! bypass exempt markers.

use parking_lot::RwLock;
use sentinel_config::{PermissionsConfig, DEFAULT_ROLE, PERM_TARGET};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::PermissionRegistry;
use crate::context::RoleContextManager;
use crate::error::{AuthError, AuthResult};
use crate::permissions::{ContextFlags, PermissionStats, SubjectId};

/// Permission facade
#[derive(Debug)]
pub struct PermissionFacade {
    /// Installed backend
    registry: Arc<PermissionRegistry>,

    /// Role contexts of active subjects
    contexts: Arc<RoleContextManager>,

    /// Lowercased node markers that elevated access never bypasses
    bypass_exempt: RwLock<Arc<Vec<String>>>,

    /// Statistics
    stats: RwLock<PermissionStats>,
}

impl PermissionFacade {
    /// Create a facade with the default exempt markers
    pub fn new(registry: Arc<PermissionRegistry>, contexts: Arc<RoleContextManager>) -> Self {
        let facade = Self {
            registry,
            contexts,
            bypass_exempt: RwLock::new(Arc::new(Vec::new())),
            stats: RwLock::new(PermissionStats::new()),
        };
        facade.apply_config(&PermissionsConfig::default());
        facade
    }

    /// Pick up the exempt markers of a new snapshot
    pub fn apply_config(&self, config: &PermissionsConfig) {
        let markers: Vec<String> = config
            .bypass_exempt
            .iter()
            .map(|marker| marker.trim().to_ascii_lowercase())
            .filter(|marker| !marker.is_empty())
            .collect();
        *self.bypass_exempt.write() = Arc::new(markers);
    }

    pub fn registry(&self) -> &Arc<PermissionRegistry> {
        &self.registry
    }

    pub fn contexts(&self) -> &Arc<RoleContextManager> {
        &self.contexts
    }

    /// Whether elevated access may skip the check for `node`
    pub fn is_bypassable(&self, node: &str) -> bool {
        let node = node.to_ascii_lowercase();
        !self
            .bypass_exempt
            .read()
            .iter()
            .any(|marker| node.contains(marker.as_str()))
    }

    /// Whether `subject` may use `node` in `context`
    pub fn authorized(&self, subject: &SubjectId, node: &str, context: &ContextFlags) -> bool {
        let Some(service) = self.registry.active() else {
            self.stats.write().increment_denied();
            warn!(target: PERM_TARGET, "No permission backend installed, denied {} for {}", node, subject);
            return false;
        };

        if service.check(subject, node, context) {
            self.stats.write().increment_allowed();
            debug!(target: PERM_TARGET, "{} allowed {}", subject, node);
            return true;
        }

        let elevated = self
            .contexts
            .peek(subject)
            .map(|ctx| ctx.is_elevated())
            .unwrap_or(false);
        if elevated && self.is_bypassable(node) {
            self.stats.write().increment_bypassed();
            debug!(target: PERM_TARGET, "{} allowed {} through elevated access", subject, node);
            return true;
        }

        self.stats.write().increment_denied();
        debug!(target: PERM_TARGET, "{} denied {}", subject, node);
        false
    }

    /// Like [`authorized`](Self::authorized) using the subject's own context flags
    pub fn authorized_in_context(&self, subject: &SubjectId, node: &str) -> bool {
        let flags = self
            .contexts
            .peek(subject)
            .map(|ctx| ctx.flags())
            .unwrap_or_default();
        self.authorized(subject, node, &flags)
    }

    /// Primary group of `subject`
    pub fn group(&self, subject: &SubjectId) -> String {
        self.registry
            .active()
            .map(|service| service.group(subject))
            .unwrap_or_else(|| DEFAULT_ROLE.to_string())
    }

    /// Set the primary group in the service and mirror it into the context
    pub fn set_group(&self, subject: &SubjectId, group: &str) {
        let effective = match self.registry.active() {
            Some(service) => {
                service.set_group(subject, group);
                service.group(subject)
            }
            None => group.to_string(),
        };
        self.contexts.set_group(subject, &effective);
        info!(target: PERM_TARGET, "Group of {} is now '{}'", subject, effective);
    }

    /// Like [`set_group`](Self::set_group) but refuses unknown groups
    pub fn assign_group(&self, subject: &SubjectId, group: &str) -> AuthResult<()> {
        let service = self.registry.require_active()?;
        if !service.group_exists(group) {
            return Err(AuthError::unknown_role(group));
        }
        self.set_group(subject, group);
        Ok(())
    }

    pub fn inherited_groups(&self, subject: &SubjectId) -> Vec<String> {
        self.registry
            .active()
            .map(|service| service.inherited_groups(subject))
            .unwrap_or_else(|| vec![DEFAULT_ROLE.to_string()])
    }

    pub fn group_exists(&self, group: &str) -> bool {
        self.registry
            .active()
            .map(|service| service.group_exists(group))
            .unwrap_or(false)
    }

    /// Check statistics
    pub fn stats(&self) -> PermissionStats {
        self.stats.read().clone()
    }
}
