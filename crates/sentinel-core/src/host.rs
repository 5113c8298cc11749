//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Host environment seam

use sentinel_auth::SubjectId;
use std::fmt::Debug;

/// Services the embedding host provides
pub trait HostRuntime: Send + Sync + Debug {
    /// Whether the platform itself grants `subject` operator status
    fn is_platform_privileged(&self, subject: &SubjectId) -> bool;
}

/// Host without platform-level operators
#[derive(Debug, Default, Clone, Copy)]
pub struct StandaloneHost;

impl HostRuntime for StandaloneHost {
    fn is_platform_privileged(&self, _subject: &SubjectId) -> bool {
        false
    }
}
