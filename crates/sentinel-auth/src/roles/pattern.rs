//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Permission node patterns
//!
//! A pattern is either `*`, a prefix ending in `*`, or an exact node. All
//! comparisons ignore ASCII case.

use std::fmt;

/// Compiled permission pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodePattern {
    /// Matches every node
    Any,

    /// Matches nodes starting with the text before the trailing `*`
    Prefix(String),

    /// Matches one node
    Exact(String),
}

impl NodePattern {
    /// Compile a pattern from its configured text
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim();
        if pattern == "*" {
            NodePattern::Any
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            NodePattern::Prefix(prefix.to_string())
        } else {
            NodePattern::Exact(pattern.to_string())
        }
    }

    /// Whether `node` is matched by this pattern
    pub fn matches(&self, node: &str) -> bool {
        match self {
            NodePattern::Any => true,
            NodePattern::Prefix(prefix) => {
                let node = node.as_bytes();
                let prefix = prefix.as_bytes();
                node.len() >= prefix.len() && node[..prefix.len()].eq_ignore_ascii_case(prefix)
            }
            NodePattern::Exact(exact) => exact.eq_ignore_ascii_case(node),
        }
    }
}

impl fmt::Display for NodePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodePattern::Any => write!(f, "*"),
            NodePattern::Prefix(prefix) => write!(f, "{}*", prefix),
            NodePattern::Exact(exact) => write!(f, "{}", exact),
        }
    }
}

/// Whether any pattern in `patterns` matches `node`
pub fn any_matches(patterns: &[NodePattern], node: &str) -> bool {
    patterns.iter().any(|pattern| pattern.matches(node))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_prefix() {
        let pattern = NodePattern::parse("sentinelcore.*");
        assert!(pattern.matches("sentinelcore.audit"));
        assert!(pattern.matches("SentinelCore.Audit.Toggle"));
        assert!(!pattern.matches("other.audit"));
        assert!(!pattern.matches("sentinelcore"));
    }

    #[test]
    fn test_wildcard_prefix_boundary() {
        let pattern = NodePattern::parse("sentinelcore.*");
        assert!(pattern.matches("sentinelcore.foo.bar"));
        assert!(pattern.matches("sentinelcore."));
        assert!(!pattern.matches("sentinelcoreX.foo"));
        assert!(!pattern.matches("xsentinelcore.foo"));
    }

    #[test]
    fn test_star_matches_everything() {
        let pattern = NodePattern::parse("*");
        assert_eq!(pattern, NodePattern::Any);
        assert!(pattern.matches(""));
        assert!(pattern.matches("anything.at.all"));
    }

    #[test]
    fn test_exact_is_case_insensitive() {
        let pattern = NodePattern::parse("sentinelcore.logs");
        assert!(pattern.matches("SENTINELCORE.LOGS"));
        assert!(!pattern.matches("sentinelcore.logs.view"));
    }

    #[test]
    fn test_prefix_with_multibyte_node() {
        let pattern = NodePattern::parse("ab*");
        assert!(!pattern.matches("é"));
        assert!(pattern.matches("abé"));
        assert_eq!(pattern.to_string(), "ab*");
    }
}
