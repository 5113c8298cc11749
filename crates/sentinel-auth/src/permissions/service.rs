//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Permission service contract

use std::collections::BTreeMap;
use std::fmt::Debug;
use uuid::Uuid;

/// Identifier of an authenticated principal
pub type SubjectId = Uuid;

/// Key/value flags describing the subject's current context
pub type ContextFlags = BTreeMap<String, String>;

/// Answers permission questions for subjects
///
/// Implementations are installed behind a single reference and replaced
/// wholesale when the backend changes. Checks run on hot paths and must not
/// block on I/O.
pub trait PermissionService: Send + Sync + Debug {
    /// Backend name for logs and diagnostics
    fn name(&self) -> &'static str;

    /// Whether `subject` holds `node` in `context`
    fn check(&self, subject: &SubjectId, node: &str, context: &ContextFlags) -> bool;

    /// Primary group of `subject`
    fn group(&self, subject: &SubjectId) -> String;

    /// Change the primary group of `subject`
    fn set_group(&self, subject: &SubjectId, group: &str);

    /// Primary group followed by every inherited group
    fn inherited_groups(&self, subject: &SubjectId) -> Vec<String>;

    /// Whether a group with this name exists
    fn group_exists(&self, group: &str) -> bool;
}
