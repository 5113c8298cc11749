//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Role table and permission resolution
//!
//! A [`RoleTable`] is an immutable view of one configuration snapshot. Roles
//! are looked up by name and parents are followed with an explicit stack and
//! a visited set, so cyclic or very deep inheritance terminates without
//! growing the call stack.

use sentinel_config::{DenyPolicy, PermissionsConfig, PERM_TARGET};
use std::collections::{HashMap, HashSet};
use tracing::warn;
use uuid::Uuid;

use super::model::Role;

/// Immutable role graph with subject assignments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTable {
    roles: HashMap<String, Role>,
    default_role: String,
    assignments: HashMap<Uuid, String>,
    deny_policy: DenyPolicy,
}

impl Default for RoleTable {
    fn default() -> Self {
        Self::from_config(&PermissionsConfig::default())
    }
}

impl RoleTable {
    /// Build a table from the permission section of a snapshot
    ///
    /// Assignments naming unknown roles and keys that are not UUIDs are
    /// dropped with a warning.
    pub fn from_config(config: &PermissionsConfig) -> Self {
        let roles: HashMap<String, Role> = config
            .roles
            .iter()
            .map(|(name, role)| (name.clone(), Role::from_config(name.clone(), role)))
            .collect();

        let mut assignments = HashMap::new();
        for (key, role) in &config.user_roles {
            let subject = match Uuid::parse_str(key.trim()) {
                Ok(subject) => subject,
                Err(_) => {
                    warn!(target: PERM_TARGET, "Skipping role assignment for invalid subject id '{}'", key);
                    continue;
                }
            };
            if !roles.contains_key(role) {
                warn!(
                    target: PERM_TARGET,
                    "Skipping assignment of {} to unknown role '{}'", subject, role
                );
                continue;
            }
            assignments.insert(subject, role.clone());
        }

        Self {
            roles,
            default_role: config.default_role.clone(),
            assignments,
            deny_policy: config.deny_policy,
        }
    }

    pub fn default_role(&self) -> &str {
        &self.default_role
    }

    pub fn deny_policy(&self) -> DenyPolicy {
        self.deny_policy
    }

    pub fn role(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    pub fn contains_role(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    /// Explicit assignment of a subject, if any
    pub fn assignment(&self, subject: &Uuid) -> Option<&str> {
        self.assignments.get(subject).map(String::as_str)
    }

    /// Role of a subject: its assignment or the default role
    pub fn role_of(&self, subject: &Uuid) -> &str {
        self.assignment(subject).unwrap_or(&self.default_role)
    }

    /// Copy of this table with `subject` assigned to `role`
    ///
    /// An unknown role clears the assignment instead.
    pub fn with_assignment(&self, subject: Uuid, role: &str) -> Self {
        let mut table = self.clone();
        if table.roles.contains_key(role) {
            table.assignments.insert(subject, role.to_string());
        } else {
            table.assignments.remove(&subject);
        }
        table
    }

    /// Resolve `node` for `subject`
    pub fn check(&self, subject: &Uuid, node: &str) -> bool {
        self.check_role(self.role_of(subject), node)
    }

    /// Resolve `node` starting from `role` under the table's deny policy
    pub fn check_role(&self, role: &str, node: &str) -> bool {
        match self.deny_policy {
            DenyPolicy::BranchLocal => self.check_branch_local(role, node),
            DenyPolicy::GlobalVeto => self.check_global_veto(role, node),
        }
    }

    // A deny closes the branch of the role declaring it; the first reachable
    // allow wins.
    fn check_branch_local(&self, start: &str, node: &str) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![start];

        while let Some(name) = stack.pop() {
            let Some(role) = self.roles.get(name) else {
                continue;
            };
            if !visited.insert(name) {
                continue;
            }
            if role.denies(node) {
                continue;
            }
            if role.allows(node) {
                return true;
            }
            stack.extend(role.inherits.iter().rev().map(String::as_str));
        }

        false
    }

    fn check_global_veto(&self, start: &str, node: &str) -> bool {
        let closure = self.closure(start);
        if closure.iter().any(|role| role.denies(node)) {
            return false;
        }
        closure.iter().any(|role| role.allows(node))
    }

    /// Roles reachable from `start` in depth-first visit order, unknown
    /// names skipped
    pub fn closure(&self, start: &str) -> Vec<&Role> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![start];

        while let Some(name) = stack.pop() {
            let Some(role) = self.roles.get(name) else {
                continue;
            };
            if !visited.insert(name) {
                continue;
            }
            order.push(role);
            stack.extend(role.inherits.iter().rev().map(String::as_str));
        }

        order
    }

    /// Names of the subject's role and every role it inherits
    pub fn inherited_groups(&self, subject: &Uuid) -> Vec<String> {
        self.closure(self.role_of(subject))
            .into_iter()
            .map(|role| role.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_config::RoleConfig;

    fn config(roles: &[(&str, RoleConfig)]) -> PermissionsConfig {
        let mut config = PermissionsConfig::default();
        for (name, role) in roles {
            config.roles.insert(name.to_string(), role.clone());
        }
        config
    }

    fn assigned(config: &mut PermissionsConfig, role: &str) -> Uuid {
        let subject = Uuid::new_v4();
        config
            .user_roles
            .insert(subject.to_string(), role.to_string());
        subject
    }

    #[test]
    fn test_two_role_cycle_terminates() {
        let mut cfg = config(&[
            ("a", RoleConfig::new(&[], &[], &["b"])),
            ("b", RoleConfig::new(&[], &[], &["a"])),
        ]);
        let subject = assigned(&mut cfg, "a");
        let table = RoleTable::from_config(&cfg);

        assert!(!table.check(&subject, "anything"));
        assert_eq!(table.inherited_groups(&subject), vec!["a", "b"]);
    }

    #[test]
    fn test_self_cycle_terminates() {
        let mut cfg = config(&[("loop", RoleConfig::new(&["x.y"], &[], &["loop"]))]);
        let subject = assigned(&mut cfg, "loop");
        let table = RoleTable::from_config(&cfg);

        assert!(table.check(&subject, "x.y"));
        assert!(!table.check(&subject, "x.z"));
        assert_eq!(table.inherited_groups(&subject), vec!["loop"]);
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let depth = 50_000;
        let mut cfg = PermissionsConfig::default();
        for i in 0..depth {
            let parent = format!("r{}", i + 1);
            cfg.roles
                .insert(format!("r{}", i), RoleConfig::new(&[], &[], &[&parent]));
        }
        cfg.roles.insert(
            format!("r{}", depth),
            RoleConfig::new(&["deep.node"], &[], &["r0"]),
        );
        let subject = assigned(&mut cfg, "r0");
        let table = RoleTable::from_config(&cfg);

        assert!(table.check(&subject, "deep.node"));
        assert!(!table.check(&subject, "shallow.node"));
        assert_eq!(table.inherited_groups(&subject).len(), depth + 1);
    }

    #[test]
    fn test_moderator_wildcard_over_default() {
        let mut cfg = config(&[(
            "moderator",
            RoleConfig::new(&["x.mod.*"], &[], &["default"]),
        )]);
        let moderator = assigned(&mut cfg, "moderator");
        let table = RoleTable::from_config(&cfg);

        assert!(table.check(&moderator, "x.mod.kick"));
        assert!(table.check(&moderator, "X.Mod.Mute.Long"));
        assert!(!table.check(&moderator, "x.admin.ban"));
        assert!(!table.check(&moderator, "x.modx.kick"));
        assert_eq!(table.inherited_groups(&moderator), vec!["moderator", "default"]);
    }

    #[test]
    fn test_deny_is_branch_local() {
        // child -> [denier, granter]; denier refuses the node and would grant
        // it through its own parent, granter allows it
        let mut cfg = config(&[
            ("child", RoleConfig::new(&[], &[], &["denier", "granter"])),
            ("denier", RoleConfig::new(&[], &["shop.buy"], &["hidden"])),
            ("hidden", RoleConfig::new(&["shop.*"], &[], &[])),
            ("granter", RoleConfig::new(&["shop.buy"], &[], &[])),
        ]);
        let child = assigned(&mut cfg, "child");
        let denier = assigned(&mut cfg, "denier");
        let table = RoleTable::from_config(&cfg);

        assert!(table.check(&child, "shop.buy"));
        assert!(!table.check(&denier, "shop.buy"));
        assert!(table.check(&denier, "shop.sell"));
    }

    #[test]
    fn test_own_deny_wins_over_own_allow() {
        let mut cfg = config(&[("r", RoleConfig::new(&["a.*"], &["a.secret"], &[]))]);
        let subject = assigned(&mut cfg, "r");
        let table = RoleTable::from_config(&cfg);

        assert!(table.check(&subject, "a.public"));
        assert!(!table.check(&subject, "a.secret"));
    }

    #[test]
    fn test_global_veto_denies_from_any_branch() {
        let mut cfg = config(&[
            ("child", RoleConfig::new(&[], &[], &["denier", "granter"])),
            ("denier", RoleConfig::new(&[], &["shop.buy"], &[])),
            ("granter", RoleConfig::new(&["shop.*"], &[], &[])),
        ]);
        cfg.deny_policy = DenyPolicy::GlobalVeto;
        let child = assigned(&mut cfg, "child");
        let table = RoleTable::from_config(&cfg);

        assert!(!table.check(&child, "shop.buy"));
        assert!(table.check(&child, "shop.sell"));
    }

    #[test]
    fn test_unassigned_subject_uses_default_role() {
        let cfg = config(&[("default", RoleConfig::new(&["chat.talk"], &[], &[]))]);
        let table = RoleTable::from_config(&cfg);
        let stranger = Uuid::new_v4();

        assert_eq!(table.role_of(&stranger), "default");
        assert!(table.check(&stranger, "chat.talk"));
    }

    #[test]
    fn test_invalid_assignments_are_dropped() {
        let mut cfg = PermissionsConfig::default();
        cfg.user_roles
            .insert("not-a-uuid".to_string(), "default".to_string());
        let ghost = assigned(&mut cfg, "ghost");
        let table = RoleTable::from_config(&cfg);

        assert_eq!(table.assignment(&ghost), None);
        assert_eq!(table.role_of(&ghost), "default");
    }

    #[test]
    fn test_unknown_parents_are_skipped() {
        let mut cfg = config(&[("r", RoleConfig::new(&[], &[], &["missing", "default"]))]);
        let subject = assigned(&mut cfg, "r");
        let table = RoleTable::from_config(&cfg);

        assert_eq!(table.inherited_groups(&subject), vec!["r", "default"]);
    }

    #[test]
    fn test_with_assignment_unknown_role_clears() {
        let mut cfg = config(&[("mod", RoleConfig::default())]);
        let subject = assigned(&mut cfg, "mod");
        let table = RoleTable::from_config(&cfg);

        let cleared = table.with_assignment(subject, "nope");
        assert_eq!(cleared.assignment(&subject), None);
        assert_eq!(table.assignment(&subject), Some("mod"));
    }
}
