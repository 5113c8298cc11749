//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! In-memory permission service backed by the role graph of the
//! configuration document

use parking_lot::RwLock;
use sentinel_config::{PermissionsConfig, PERM_TARGET};
use std::sync::Arc;
use tracing::{debug, info};

use super::service::{ContextFlags, PermissionService, SubjectId};
use crate::roles::RoleTable;

/// Memory permission service
#[derive(Debug, Default)]
pub struct MemoryPermissionService {
    /// Current role table
    table: RwLock<Arc<RoleTable>>,
}

impl MemoryPermissionService {
    /// Create a service from the permission section of a snapshot
    pub fn new(config: &PermissionsConfig) -> Self {
        Self {
            table: RwLock::new(Arc::new(RoleTable::from_config(config))),
        }
    }

    /// Rebuild the role table and swap it in
    pub fn reload(&self, config: &PermissionsConfig) {
        let table = Arc::new(RoleTable::from_config(config));
        info!(
            target: PERM_TARGET,
            "Memory permission service reloaded: {} roles, default role '{}'",
            table.role_count(),
            table.default_role()
        );
        *self.table.write() = table;
    }

    /// Current role table
    pub fn table(&self) -> Arc<RoleTable> {
        self.table.read().clone()
    }
}

impl PermissionService for MemoryPermissionService {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn check(&self, subject: &SubjectId, node: &str, _context: &ContextFlags) -> bool {
        let allowed = self.table().check(subject, node);
        debug!(target: PERM_TARGET, "memory check {} {} -> {}", subject, node, allowed);
        allowed
    }

    fn group(&self, subject: &SubjectId) -> String {
        self.table().role_of(subject).to_string()
    }

    fn set_group(&self, subject: &SubjectId, group: &str) {
        let mut table = self.table.write();
        let updated = table.with_assignment(*subject, group);
        match updated.assignment(subject) {
            Some(role) => info!(target: PERM_TARGET, "Assigned {} to role '{}'", subject, role),
            None => info!(
                target: PERM_TARGET,
                "Cleared role assignment of {} (unknown role '{}')", subject, group
            ),
        }
        *table = Arc::new(updated);
    }

    fn inherited_groups(&self, subject: &SubjectId) -> Vec<String> {
        self.table().inherited_groups(subject)
    }

    fn group_exists(&self, group: &str) -> bool {
        self.table().contains_role(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_config::RoleConfig;
    use std::thread;
    use uuid::Uuid;

    fn moderator_config() -> (PermissionsConfig, Uuid) {
        let mut config = PermissionsConfig::default();
        config.roles.insert(
            "moderator".to_string(),
            RoleConfig::new(&["sentinelcore.*"], &["sentinelcore.admin.*"], &["default"]),
        );
        let subject = Uuid::new_v4();
        config
            .user_roles
            .insert(subject.to_string(), "moderator".to_string());
        (config, subject)
    }

    #[test]
    fn test_moderator_wildcard() {
        let (config, subject) = moderator_config();
        let service = MemoryPermissionService::new(&config);
        let ctx = ContextFlags::new();

        assert!(service.check(&subject, "sentinelcore.logs", &ctx));
        assert!(service.check(&subject, "sentinelcore.audit.toggle", &ctx));
        assert!(!service.check(&subject, "sentinelcore.admin.reload", &ctx));
        assert!(!service.check(&subject, "other.node", &ctx));
        assert_eq!(service.group(&subject), "moderator");
        assert_eq!(
            service.inherited_groups(&subject),
            vec!["moderator".to_string(), "default".to_string()]
        );
    }

    #[test]
    fn test_set_group() {
        let (config, subject) = moderator_config();
        let service = MemoryPermissionService::new(&config);
        let other = Uuid::new_v4();

        service.set_group(&other, "moderator");
        assert_eq!(service.group(&other), "moderator");

        service.set_group(&subject, "missing");
        assert_eq!(service.group(&subject), "default");
        assert!(!service.group_exists("missing"));
    }

    #[test]
    fn test_reload_is_idempotent() {
        let (config, subject) = moderator_config();
        let service = MemoryPermissionService::new(&config);
        let before = service.table();

        service.reload(&config);
        service.reload(&config);
        assert_eq!(*service.table(), *before);
        assert_eq!(service.group(&subject), "moderator");
    }

    #[test]
    fn test_readers_never_see_mixed_tables() {
        let subject = Uuid::new_v4();
        let build = |chain: &[&str]| {
            let mut config = PermissionsConfig::default();
            for pair in chain.windows(2) {
                config
                    .roles
                    .insert(pair[0].to_string(), RoleConfig::new(&[], &[], &[pair[1]]));
            }
            if let Some(last) = chain.last() {
                config.roles.insert(last.to_string(), RoleConfig::default());
            }
            config
                .user_roles
                .insert(subject.to_string(), chain[0].to_string());
            config
        };
        let first = build(&["a", "b", "c"]);
        let second = build(&["a", "d", "e", "f"]);
        let expected_first: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let expected_second: Vec<String> = vec!["a".into(), "d".into(), "e".into(), "f".into()];

        let service = Arc::new(MemoryPermissionService::new(&first));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                let (a, b) = (expected_first.clone(), expected_second.clone());
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        let groups = service.inherited_groups(&subject);
                        assert!(groups == a || groups == b, "mixed snapshot: {:?}", groups);
                    }
                })
            })
            .collect();

        for i in 0..500 {
            service.reload(if i % 2 == 0 { &second } else { &first });
        }
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
