//! Append-only record of alt text the engine has written.
//!
//! One line per entry: `[<timestamp>] <context>: Asset <id> alt set to: <text>`.
//! Appending goes through `tokio::fs` and never fails the caller; I/O
//! problems are reported through `tracing` and otherwise ignored.

use crate::models::{AssetId, ContextTag};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::warn;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub asset_id: AssetId,
    pub alt_text: String,
    pub context: ContextTag,
}

impl LogEntry {
    pub fn now(asset_id: AssetId, alt_text: impl Into<String>, context: ContextTag) -> Self {
        Self {
            timestamp: Utc::now(),
            asset_id,
            alt_text: alt_text.into(),
            context,
        }
    }

    pub fn to_line(&self) -> String {
        // Keep one entry per line even if a title carried line breaks.
        let text = self.alt_text.replace(['\r', '\n'], " ");
        format!(
            "[{}] {}: Asset {} alt set to: {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.context,
            self.asset_id,
            text
        )
    }

    pub fn parse_line(line: &str) -> Option<Self> {
        let rest = line.strip_prefix('[')?;
        let (ts, rest) = rest.split_once("] ")?;
        let timestamp = NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT)
            .ok()?
            .and_utc();
        let (context, rest) = rest.split_once(": Asset ")?;
        let (id, alt_text) = rest.split_once(" alt set to: ")?;
        Some(Self {
            timestamp,
            asset_id: id.trim().parse().ok()?,
            alt_text: alt_text.to_string(),
            context: context.parse().ok()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `entry` when `enabled`; otherwise does nothing.
    pub async fn append(&self, entry: &LogEntry, enabled: bool) {
        if !enabled {
            return;
        }
        if let Err(e) = self.write_line(&entry.to_line()).await {
            warn!(
                path = %self.path.display(),
                asset_id = entry.asset_id,
                error = %e,
                "failed to append audit log entry"
            );
        }
    }

    async fn write_line(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{line}\n").as_bytes()).await?;
        file.flush().await
    }

    /// All parseable entries, oldest first. A missing file means no entries.
    pub fn entries(&self) -> anyhow::Result<Vec<LogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(content.lines().filter_map(LogEntry::parse_line).collect())
    }

    pub fn tail(&self, n: usize) -> anyhow::Result<Vec<LogEntry>> {
        let mut entries = self.entries()?;
        let skip = entries.len().saturating_sub(n);
        Ok(entries.split_off(skip))
    }
}
