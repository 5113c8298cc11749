//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Configuration store for SentinelCore
//!
//! This crate owns the configuration document and its lifecycle:
//! - Loading and persisting the document as YAML or JSON
//! - Atomic snapshot replacement on reload
//! - Debounced hot reloading driven by filesystem events
//! - Change fan-out to listeners and broadcast subscribers
//! - Feature flags and logging categories derived from the document

pub mod categories;
pub mod error;
pub mod flags;
pub mod model;
pub mod store;
pub mod watcher;

// Re-export commonly used types
pub use categories::{
    category_directives, LogCategory, AUDIT_TARGET, CONFIG_TARGET, CONTEXT_TARGET, PERM_TARGET,
};
pub use error::{ConfigError, ConfigResult};
pub use flags::FeatureFlags;
pub use model::{
    AuditConfig, DenyPolicy, PermissionsConfig, RoleConfig, RotationPolicy, SentinelConfig,
    DEFAULT_ROLE,
};
pub use store::{ConfigListener, ConfigStore, ListenerResult, ReloadStats, CONFIG_JSON, CONFIG_YAML};
pub use watcher::{ReloadSignal, DEFAULT_DEBOUNCE};
