//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Permission services

pub mod external;
pub mod memory;
pub mod service;
pub mod stats;

// Re-export commonly used types
pub use external::{BridgePermissionService, ExternalAuthority, MirrorPermissionService};
pub use memory::MemoryPermissionService;
pub use service::{ContextFlags, PermissionService, SubjectId};
pub use stats::PermissionStats;
