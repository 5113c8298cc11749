//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Configuration document model
//!
//! The whole document is replaced on every reload, so every section derives
//! `Default` and `PartialEq`. Missing keys fall back to their defaults which
//! lets operators keep minimal files.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Name of the role every subject falls back to
pub const DEFAULT_ROLE: &str = "default";

/// Root configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    /// Feature flag name to on/off
    pub feature_flags: BTreeMap<String, bool>,

    /// Logging category to on/off
    pub logging: BTreeMap<String, bool>,

    /// Permission backend and role graph
    pub permissions: PermissionsConfig,

    /// Audit pipeline settings
    pub audit: AuditConfig,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        let mut feature_flags = BTreeMap::new();
        feature_flags.insert("example_flag".to_string(), false);

        let logging = crate::categories::LogCategory::ALL
            .iter()
            .map(|category| (category.id().to_string(), true))
            .collect();

        Self {
            feature_flags,
            logging,
            permissions: PermissionsConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

impl SentinelConfig {
    /// Collect non-fatal consistency warnings about the role graph
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let roles = &self.permissions.roles;

        if !roles.contains_key(&self.permissions.default_role) {
            warnings.push(format!(
                "default role '{}' is not defined; unassigned subjects hold no permissions",
                self.permissions.default_role
            ));
        }

        for (name, role) in roles {
            for parent in &role.inherits {
                if !roles.contains_key(parent) {
                    warnings.push(format!(
                        "role '{}' inherits unknown role '{}'",
                        name, parent
                    ));
                }
            }
        }

        for (subject, role) in &self.permissions.user_roles {
            if !roles.contains_key(role) {
                warnings.push(format!(
                    "subject {} is assigned unknown role '{}'",
                    subject, role
                ));
            }
        }

        warnings
    }
}

/// Permission section of the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Backend selector (`memory`, `bridge`, `mirror`)
    pub backend: String,

    /// Role used for subjects without an explicit assignment
    pub default_role: String,

    /// Role definitions keyed by name
    pub roles: BTreeMap<String, RoleConfig>,

    /// Subject id to role name
    pub user_roles: BTreeMap<String, String>,

    /// How deny patterns interact with inheritance
    pub deny_policy: DenyPolicy,

    /// Node substrings that elevated access never bypasses
    pub bypass_exempt: Vec<String>,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        let mut roles = BTreeMap::new();
        roles.insert(DEFAULT_ROLE.to_string(), RoleConfig::default());

        Self {
            backend: "memory".to_string(),
            default_role: DEFAULT_ROLE.to_string(),
            roles,
            user_roles: BTreeMap::new(),
            deny_policy: DenyPolicy::default(),
            bypass_exempt: vec!["admin.dangerous".to_string()],
        }
    }
}

/// A named bundle of allow/deny patterns and parent roles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    /// Patterns this role grants
    pub allow: Vec<String>,

    /// Patterns this role refuses
    pub deny: Vec<String>,

    /// Parent roles, resolved in this order
    #[serde(alias = "inherit")]
    pub inherits: Vec<String>,
}

impl RoleConfig {
    /// Create a role from string slices
    pub fn new(allow: &[&str], deny: &[&str], inherits: &[&str]) -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            allow: owned(allow),
            deny: owned(deny),
            inherits: owned(inherits),
        }
    }
}

/// Deny semantics across the inheritance graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyPolicy {
    /// A deny only closes the branch of the role that declares it
    #[default]
    BranchLocal,

    /// A deny anywhere in the reachable roles wins
    GlobalVeto,
}

/// Audit file rotation period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
}

/// Audit section of the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Whether audit recording is on
    pub enabled: bool,

    /// Directory holding rotation files
    pub directory: PathBuf,

    /// Rotation period
    pub rotation: RotationPolicy,

    /// Days to keep rotation files; zero or negative keeps them forever
    pub retention_days: i64,

    /// Root command tokens that are never recorded
    pub excluded_commands: BTreeSet<String>,

    /// Substrings masked before persistence
    pub redact_substrings: Vec<String>,

    /// Whether the secondary ledger sink is on
    pub ledger_enabled: bool,

    /// Ledger sink mode
    pub ledger_mode: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("logs/sentinel"),
            rotation: RotationPolicy::Daily,
            retention_days: 30,
            excluded_commands: BTreeSet::new(),
            redact_substrings: Vec::new(),
            ledger_enabled: false,
            ledger_mode: "logger".to_string(),
        }
    }
}

impl AuditConfig {
    /// Resolve the audit directory against a base directory when relative
    pub fn resolve_directory(&self, base: &Path) -> PathBuf {
        if self.directory.is_absolute() {
            self.directory.clone()
        } else {
            base.join(&self.directory)
        }
    }
}
