//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Role model

use sentinel_config::RoleConfig;

use super::pattern::{any_matches, NodePattern};

/// Role with compiled patterns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    /// Role name
    pub name: String,

    /// Granted patterns
    pub allow: Vec<NodePattern>,

    /// Refused patterns
    pub deny: Vec<NodePattern>,

    /// Parent role names in resolution order
    pub inherits: Vec<String>,
}

impl Role {
    /// Compile a role from its configuration
    pub fn from_config(name: impl Into<String>, config: &RoleConfig) -> Self {
        Self {
            name: name.into(),
            allow: config.allow.iter().map(|p| NodePattern::parse(p)).collect(),
            deny: config.deny.iter().map(|p| NodePattern::parse(p)).collect(),
            inherits: config.inherits.clone(),
        }
    }

    /// Whether this role grants `node` directly
    pub fn allows(&self, node: &str) -> bool {
        any_matches(&self.allow, node)
    }

    /// Whether this role refuses `node` directly
    pub fn denies(&self, node: &str) -> bool {
        any_matches(&self.deny, node)
    }
}
