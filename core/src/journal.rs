//! Interaction log
//!
//! One JSON array on disk, one entry per user turn. Every append rewrites the
//! whole file; a missing file or one that is not a JSON array counts as an
//! empty log. Existing elements are carried over untouched even when they do
//! not match [`LogEntry`]. There is no locking, so only one process should
//! write a given file.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;

/// Result recorded when the model service could not be reached
pub const CONNECTION_ERROR_MARKER: &str = "APIConnectionError";
/// Model output recorded for turns that never got one
pub const NO_MODEL_OUTPUT: &str = "N/A";

/// One user turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Offset-less ISO 8601 stamps are read as UTC
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub user_input: String,
    /// Raw model output
    pub ai_command: String,
    /// Stringified outcome
    pub result: String,
}

impl LogEntry {
    pub fn new(
        user_input: impl Into<String>,
        ai_command: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            user_input: user_input.into(),
            ai_command: ai_command.into(),
            result: result.into(),
        }
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f").map(|naive| naive.and_utc())
        })
        .map_err(serde::de::Error::custom)
}

/// Append-only JSON log file
#[derive(Debug, Clone)]
pub struct InteractionLog {
    path: PathBuf,
}

impl InteractionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw array elements; empty when missing or not a JSON array
    async fn load_raw(&self) -> Vec<Value> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Could not read log {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                warn!("Log {} is not a JSON array; starting over", self.path.display());
                Vec::new()
            }
            Err(e) => {
                warn!("Log {} is not valid JSON ({}); starting over", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Entries that match [`LogEntry`], oldest first
    pub async fn entries(&self) -> Vec<LogEntry> {
        self.load_raw()
            .await
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping unrecognised log entry: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Read, append, rewrite
    pub async fn append(&self, entry: LogEntry) -> Result<()> {
        let mut items = self.load_raw().await;
        items.push(serde_json::to_value(&entry)?);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&items)?;
        tokio::fs::write(&self.path, json).await?;

        debug!("Logged turn #{} to {}", items.len(), self.path.display());
        Ok(())
    }

    /// Convenience for [`InteractionLog::append`] with a fresh timestamp
    pub async fn record(&self, user_input: &str, ai_command: &str, result: &str) -> Result<()> {
        self.append(LogEntry::new(user_input, ai_command, result)).await
    }
}
