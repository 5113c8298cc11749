//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Read-back of the most recent rotation file

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{AuditError, AuditResult};
use crate::file_sink::{file_name, is_rotation_file};

/// Lines returned when the caller does not ask for a count
pub const DEFAULT_TAIL_LINES: usize = 20;

/// Most lines a tail returns
pub const MAX_TAIL_LINES: usize = 200;

/// Characters kept per displayed line
pub const MAX_LINE_CHARS: usize = 240;

/// Summary used when nothing has been recorded
pub const NO_LOGS_SUMMARY: &str = "No audit logs yet.";

/// Result of a tail request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailReport {
    /// File the lines were read from
    pub file: Option<PathBuf>,

    /// Display lines, oldest first
    pub lines: Vec<String>,

    /// One-line summary
    pub summary: String,
}

impl TailReport {
    fn empty() -> Self {
        Self {
            file: None,
            lines: Vec::new(),
            summary: NO_LOGS_SUMMARY.to_string(),
        }
    }
}

/// Lexicographically greatest rotation file in `directory`
pub async fn latest_rotation_file(directory: &Path) -> AuditResult<Option<PathBuf>> {
    let mut entries = match fs::read_dir(directory).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(AuditError::io(directory, e)),
    };

    let mut latest: Option<String> = None;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AuditError::io(directory, e))?
    {
        if let Some(name) = entry.file_name().to_str() {
            if is_rotation_file(name) && latest.as_deref().map_or(true, |best| name > best) {
                latest = Some(name.to_string());
            }
        }
    }

    Ok(latest.map(|name| directory.join(name)))
}

/// Last `lines` lines of the latest rotation file in `directory`
pub async fn tail(directory: &Path, lines: usize) -> AuditResult<TailReport> {
    let count = lines.clamp(1, MAX_TAIL_LINES);
    let Some(path) = latest_rotation_file(directory).await? else {
        return Ok(TailReport::empty());
    };

    let content = match fs::read(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(TailReport::empty()),
        Err(e) => return Err(AuditError::io(&path, e)),
    };

    // Decoded per line so one damaged record does not hide the rest
    let all: Vec<&[u8]> = content
        .split(|byte| *byte == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
        .collect();
    let shown: Vec<String> = all[all.len().saturating_sub(count)..]
        .iter()
        .map(|line| truncate_line(&String::from_utf8_lossy(line)))
        .collect();
    let summary = format!("Shown {} lines from {}", shown.len(), file_name(&path));

    Ok(TailReport {
        file: Some(path),
        lines: shown,
        summary,
    })
}

fn truncate_line(line: &str) -> String {
    match line.char_indices().nth(MAX_LINE_CHARS) {
        Some((cut, _)) => format!("{}...", &line[..cut]),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let report = tail(&dir.path().join("absent"), 10).await.unwrap();
        assert_eq!(report.file, None);
        assert_eq!(report.summary, NO_LOGS_SUMMARY);
    }

    #[tokio::test]
    async fn test_tail_reads_latest_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("audit-2026-01-01.jsonl"), "old\n").unwrap();
        std::fs::write(dir.path().join("audit-2026-01-02.jsonl"), "a\nb\nc\n").unwrap();
        std::fs::write(dir.path().join("zzz.txt"), "ignored\n").unwrap();

        let report = tail(dir.path(), 2).await.unwrap();
        assert_eq!(report.lines, vec!["b", "c"]);
        assert_eq!(report.summary, "Shown 2 lines from audit-2026-01-02.jsonl");
    }

    #[tokio::test]
    async fn test_tail_caps_counts_and_lengths() {
        let dir = tempfile::tempdir().unwrap();
        let long = "x".repeat(MAX_LINE_CHARS + 10);
        let mut content = String::new();
        for _ in 0..(MAX_TAIL_LINES + 5) {
            content.push_str(&long);
            content.push('\n');
        }
        std::fs::write(dir.path().join("audit-2026-01-01.jsonl"), content).unwrap();

        let report = tail(dir.path(), 10_000).await.unwrap();
        assert_eq!(report.lines.len(), MAX_TAIL_LINES);
        assert_eq!(report.lines[0].len(), MAX_LINE_CHARS + 3);
        assert!(report.lines[0].ends_with("..."));

        let report = tail(dir.path(), 0).await.unwrap();
        assert_eq!(report.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_tail_survives_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let mut content = b"{\"type\":\"command\"}\n".to_vec();
        content.extend_from_slice(&[0xff, 0xfe, b'x', b'\n']);
        content.extend_from_slice(b"{\"type\":\"audit_toggle\"}\r\n");
        std::fs::write(dir.path().join("audit-2026-01-01.jsonl"), content).unwrap();

        let report = tail(dir.path(), 5).await.unwrap();
        assert_eq!(report.lines.len(), 3);
        assert_eq!(report.lines[0], "{\"type\":\"command\"}");
        assert_eq!(report.lines[1], "\u{fffd}\u{fffd}x");
        assert_eq!(report.lines[2], "{\"type\":\"audit_toggle\"}");
    }
}
