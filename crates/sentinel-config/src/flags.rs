//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Feature flag registry

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::categories::CONFIG_TARGET;
use crate::model::SentinelConfig;

/// Feature flags refreshed from every configuration snapshot
#[derive(Debug, Default)]
pub struct FeatureFlags {
    flags: RwLock<Arc<BTreeMap<String, bool>>>,
}

impl FeatureFlags {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all flags with those of `config`
    pub fn apply_config(&self, config: &SentinelConfig) {
        let flags = Arc::new(config.feature_flags.clone());
        info!(target: CONFIG_TARGET, "Feature flags loaded: {:?}", flags);
        *self.flags.write() = flags;
    }

    /// Whether a flag is on; unknown flags are off
    pub fn is_enabled(&self, flag: &str) -> bool {
        self.flags.read().get(flag).copied().unwrap_or(false)
    }

    /// Snapshot of every flag
    pub fn snapshot(&self) -> Arc<BTreeMap<String, bool>> {
        self.flags.read().clone()
    }
}
