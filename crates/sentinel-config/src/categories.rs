//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Logging categories
//!
//! Each category owns a tracing target. The `logging` section of the document
//! switches categories off by turning their target off in the filter.

use std::collections::BTreeMap;

/// Tracing target for configuration events
pub const CONFIG_TARGET: &str = "sentinel::config";

/// Tracing target for permission events
pub const PERM_TARGET: &str = "sentinel::perm";

/// Tracing target for audit pipeline events
pub const AUDIT_TARGET: &str = "sentinel::audit";

/// Tracing target for role context events
pub const CONTEXT_TARGET: &str = "sentinel::context";

/// Logging category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    Audit,
    Perm,
    Config,
    Context,
}

impl LogCategory {
    /// Every known category
    pub const ALL: [LogCategory; 4] = [
        LogCategory::Audit,
        LogCategory::Perm,
        LogCategory::Config,
        LogCategory::Context,
    ];

    /// Key used in the configuration document
    pub fn id(&self) -> &'static str {
        match self {
            LogCategory::Audit => "audit",
            LogCategory::Perm => "perm",
            LogCategory::Config => "config",
            LogCategory::Context => "context",
        }
    }

    /// Tracing target for this category
    pub fn target(&self) -> &'static str {
        match self {
            LogCategory::Audit => AUDIT_TARGET,
            LogCategory::Perm => PERM_TARGET,
            LogCategory::Config => CONFIG_TARGET,
            LogCategory::Context => CONTEXT_TARGET,
        }
    }

    /// Look a category up by its document key
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|category| category.id().eq_ignore_ascii_case(id))
    }
}

/// Filter directives switching off disabled categories
///
/// Unknown keys are treated as custom targets below `sentinel::`.
pub fn category_directives(logging: &BTreeMap<String, bool>) -> Vec<String> {
    logging
        .iter()
        .filter(|(_, enabled)| !**enabled)
        .map(|(id, _)| match LogCategory::from_id(id) {
            Some(category) => format!("{}=off", category.target()),
            None => format!("sentinel::{}=off", id.to_ascii_lowercase()),
        })
        .collect()
}
