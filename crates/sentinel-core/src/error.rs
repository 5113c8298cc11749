//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Runtime errors

use sentinel_audit::AuditError;
use sentinel_auth::AuthError;
use sentinel_config::ConfigError;
use thiserror::Error;

/// Runtime result type
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Runtime error
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authorization error: {0}")]
    Auth(#[from] AuthError),

    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

impl RuntimeError {
    pub fn telemetry(msg: impl Into<String>) -> Self {
        Self::Telemetry(msg.into())
    }
}
