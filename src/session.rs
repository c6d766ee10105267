//! Append-only conversation log.
//!
//! One JSON object per line (`{role, content, ts}`), flushed after
//! every message so a crash never loses confirmed history. The store
//! is constructor-injected with its path, which keeps it testable
//! against a temp directory. Concurrent appends to the same file are
//! last-writer-wins, which is acceptable for a single-user log.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One logged message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionEntry {
    /// "user" or "model".
    pub role: String,
    pub content: String,
    pub ts: String,
}

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create session directory {}", parent.display()))?;
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Appends one message and flushes it to disk immediately.
    pub fn append(&self, role: &str, content: &str) -> Result<()> {
        let entry = SessionEntry {
            role: role.to_string(),
            content: content.to_string(),
            ts: chrono::Utc::now().to_rfc3339(),
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(&entry)?)?;
        Ok(())
    }

    /// Returns the last `limit` entries in chronological order.
    /// Malformed lines are skipped rather than failing the whole read.
    pub fn recent(&self, limit: usize) -> Result<Vec<SessionEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let entries: Vec<SessionEntry> = content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.into_iter().skip(skip).collect())
    }

    pub fn message_count(&self) -> Result<usize> {
        Ok(self.recent(usize::MAX)?.len())
    }

    /// Erases the whole history.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
