//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Authorization errors

use thiserror::Error;

/// Authorization result type
pub type AuthResult<T> = Result<T, AuthError>;

/// Authorization error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Permission backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("External authority failed: {0}")]
    Authority(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    pub fn authority(msg: impl Into<String>) -> Self {
        Self::Authority(msg.into())
    }

    pub fn unknown_role(role: impl Into<String>) -> Self {
        Self::UnknownRole(role.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
