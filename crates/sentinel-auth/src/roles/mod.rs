//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Role graph module

pub mod model;
pub mod pattern;
pub mod table;

// Re-export commonly used types
pub use model::Role;
pub use pattern::NodePattern;
pub use table::RoleTable;
