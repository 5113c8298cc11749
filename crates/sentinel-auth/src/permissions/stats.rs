//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Permission statistics

use chrono::{DateTime, Utc};

/// Permission check statistics
#[derive(Debug, Clone, Default)]
pub struct PermissionStats {
    /// Number of checks
    pub checks: u64,

    /// Number of checks the backend allowed
    pub allowed: u64,

    /// Number of checks allowed through elevated access
    pub bypassed: u64,

    /// Number of denied checks
    pub denied: u64,

    /// Last check
    pub last_check: Option<DateTime<Utc>>,
}

impl PermissionStats {
    /// Create new permission statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an allowed check
    pub fn increment_allowed(&mut self) {
        self.record();
        self.allowed += 1;
    }

    /// Record a check allowed through elevated access
    pub fn increment_bypassed(&mut self) {
        self.record();
        self.bypassed += 1;
    }

    /// Record a denied check
    pub fn increment_denied(&mut self) {
        self.record();
        self.denied += 1;
    }

    fn record(&mut self) {
        self.checks += 1;
        self.last_check = Some(Utc::now());
    }
}
