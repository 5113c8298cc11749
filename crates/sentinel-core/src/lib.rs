//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! SentinelCore runtime
//!
//! Wires the configuration store, permission backends, role contexts and the
//! audit pipeline together, and exposes subject lifecycle hooks and the
//! administrative operations.

pub mod admin;
pub mod error;
pub mod host;
pub mod runtime;
pub mod telemetry;

// Re-export commonly used types
pub use admin::{AdminCommands, AdminOutcome, Invoker, ADMIN_NODE, AUDIT_TAIL_NODE, AUDIT_TOGGLE_NODE};
pub use error::{RuntimeError, RuntimeResult};
pub use host::{HostRuntime, StandaloneHost};
pub use runtime::{RuntimeOptions, SentinelRuntime};
pub use telemetry::{init_logging, LoggingHandle};

/// Runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
