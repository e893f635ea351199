//! Shared session types returned to the display layer.
//!
//! Both log families are reduced to these shapes. Nothing here is cached:
//! every request re-derives them from disk and drops them after responding.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which tool produced a session log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Claude Code: `~/.claude/projects/<project>/<id>.jsonl`
    Claude,
    /// Codex CLI: `~/.codex/sessions/**/*.jsonl`
    Codex,
}

impl Source {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude" => Ok(Self::Claude),
            "codex" => Ok(Self::Codex),
            _ => Err(format!("unknown session source: {s}")),
        }
    }
}

/// One row of the session list (sidebar).
///
/// Identity is `(id, source)`; ids may collide across sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub source: Source,
    pub id: String,
    /// Epoch millis, `0` when the log carries no usable timestamp
    pub timestamp: i64,
    /// First user prompt, at most 100 chars
    pub display: String,
    pub project: String,
    /// Path of the session file relative to its source root
    pub locator: String,
    pub message_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// Timestamps are passed through in whatever form the log used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    Text(String),
}

impl Timestamp {
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) if !s.is_empty() => Some(Self::Text(s.clone())),
            serde_json::Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(Self::Millis),
            _ => None,
        }
    }

    /// Epoch millis, if the value can be interpreted as a point in time
    pub fn to_millis(&self) -> Option<i64> {
        match self {
            Self::Millis(ms) => Some(*ms),
            Self::Text(s) => chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.timestamp_millis()),
        }
    }
}

/// A normalized message from either source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: Option<Timestamp>,
    pub uuid: Option<String>,
    pub tool_uses: Vec<ToolUse>,
    pub file_snapshots: Vec<SnapshotRef>,
}

impl Message {
    pub fn new(role: Role, content: String, timestamp: Option<Timestamp>, uuid: Option<String>) -> Self {
        Self {
            role,
            content,
            timestamp,
            uuid,
            tool_uses: Vec::new(),
            file_snapshots: Vec::new(),
        }
    }

    /// Empty scaffolding records are never shown.
    pub fn is_visible(&self) -> bool {
        !self.content.is_empty() || !self.tool_uses.is_empty() || !self.file_snapshots.is_empty()
    }
}

/// A tool invocation reduced to something a human can read at a glance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUse {
    pub name: String,
    pub command: String,
    /// Pretty JSON of the arguments, empty when it would repeat `command`
    pub payload: String,
    pub call_id: Option<String>,
}

/// A Claude file-history snapshot attached to the message it was taken for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRef {
    pub message_id: String,
    pub timestamp: Option<Timestamp>,
    pub is_update: bool,
    pub tracked_files: BTreeMap<String, TrackedFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedFile {
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub backup_file_name: Option<String>,
    #[serde(default)]
    pub backup_time: Option<Timestamp>,
}

/// Snapshot file contents, capped for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFile {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_bytes: Option<u64>,
}
