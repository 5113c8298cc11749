//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Pre-dispatch filtering: root command exclusion and redaction

use sentinel_config::AuditConfig;
use std::collections::BTreeSet;

/// Longest mask written in place of a redacted substring
pub const MAX_MASK_LEN: usize = 8;

/// Root command of a raw command line
///
/// Strips one leading `/` and stops at the first whitespace.
pub fn root_token(raw: &str) -> &str {
    let trimmed = raw.trim_start();
    let without_slash = trimmed.strip_prefix('/').unwrap_or(trimmed);
    without_slash
        .split_whitespace()
        .next()
        .unwrap_or("")
}

/// Exclusion and redaction rules of one configuration snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    excluded: BTreeSet<String>,
    redactions: Vec<String>,
}

impl AuditFilter {
    pub fn new<E, R>(excluded: E, redactions: R) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            excluded: excluded
                .into_iter()
                .map(|root| {
                    let root = root.as_ref().trim();
                    root.strip_prefix('/').unwrap_or(root).to_ascii_lowercase()
                })
                .filter(|root| !root.is_empty())
                .collect(),
            redactions: redactions
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(&config.excluded_commands, config.redact_substrings.iter().cloned())
    }

    /// Whether the root command of `raw` is excluded
    pub fn is_excluded(&self, raw: &str) -> bool {
        let root = root_token(raw);
        !root.is_empty() && self.excluded.contains(&root.to_ascii_lowercase())
    }

    /// Mask every configured substring of `message`
    pub fn redact(&self, message: &str) -> String {
        self.redactions
            .iter()
            .fold(message.to_string(), |text, secret| {
                let mask = "*".repeat(secret.chars().count().min(MAX_MASK_LEN));
                text.replace(secret.as_str(), &mask)
            })
    }
}
