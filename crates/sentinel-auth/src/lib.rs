//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Authorization for SentinelCore
//!
//! This crate provides:
//! - A role graph with allow/deny patterns and cycle-safe inheritance
//! - Memory, bridge and mirror permission services
//! - Backend selection with fallback to the memory service
//! - Role contexts for active subjects
//! - A permission facade with elevated access bypass

pub mod backend;
pub mod context;
pub mod error;
pub mod facade;
pub mod permissions;
pub mod roles;

// Re-export commonly used types
pub use backend::{select_backend, BackendKind, BackendSelection, FallbackReason, PermissionRegistry};
pub use context::{
    ContextChange, ContextChangeKind, RoleContext, RoleContextManager, MODMODE_FLAG, VANISHED_FLAG,
};
pub use error::{AuthError, AuthResult};
pub use facade::PermissionFacade;
pub use permissions::{
    BridgePermissionService, ContextFlags, ExternalAuthority, MemoryPermissionService,
    MirrorPermissionService, PermissionService, PermissionStats, SubjectId,
};
pub use roles::{NodePattern, Role, RoleTable};
