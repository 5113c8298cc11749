//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Logging initialization
//!
//! The filter is built from `RUST_LOG` (or `info`) plus one `off` directive
//! per disabled logging category, and sits behind a reload layer so category
//! switches take effect on every configuration reload.

use sentinel_config::category_directives;
use std::collections::BTreeMap;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use crate::error::{RuntimeError, RuntimeResult};

/// Base filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "info";

/// Handle for swapping the active filter
#[derive(Clone)]
pub struct LoggingHandle {
    base: String,
    handle: reload::Handle<EnvFilter, Registry>,
}

impl std::fmt::Debug for LoggingHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingHandle")
            .field("base", &self.base)
            .finish()
    }
}

impl LoggingHandle {
    /// Rebuild the filter for a `logging` section
    pub fn apply(&self, logging: &BTreeMap<String, bool>) -> RuntimeResult<()> {
        self.handle
            .reload(build_filter(&self.base, logging))
            .map_err(|e| RuntimeError::telemetry(format!("Failed to reload log filter: {}", e)))
    }
}

/// Filter for a base directive string and a `logging` section
pub fn build_filter(base: &str, logging: &BTreeMap<String, bool>) -> EnvFilter {
    let mut filter = EnvFilter::try_new(base).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    for directive in category_directives(logging) {
        if let Ok(directive) = directive.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Install the global subscriber
pub fn init_logging(logging: &BTreeMap<String, bool>) -> RuntimeResult<LoggingHandle> {
    let base = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.into());
    let (filter, handle) = reload::Layer::new(build_filter(&base, logging));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .map_err(|e| RuntimeError::telemetry(format!("Failed to install subscriber: {}", e)))?;

    Ok(LoggingHandle { base, handle })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_categories_are_filtered() {
        let mut logging = BTreeMap::new();
        logging.insert("perm".to_string(), false);
        logging.insert("audit".to_string(), true);

        let rendered = build_filter("info", &logging).to_string();
        assert!(rendered.contains("sentinel::perm=off"));
        assert!(!rendered.contains("sentinel::audit=off"));
    }

    #[test]
    fn test_all_categories_enabled() {
        let rendered = build_filter("warn", &BTreeMap::new()).to_string();
        assert!(!rendered.contains("=off"));
    }
}
