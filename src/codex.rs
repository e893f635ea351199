//! Parse Codex sessions from ~/.codex/sessions/
//!
//! Codex stores sessions in:
//! ~/.codex/sessions/YYYY/MM/DD/rollout-{timestamp}-{uuid}.jsonl
//! (any nesting depth is accepted)
//!
//! Records come in two shapes:
//! - wrapped: `{"timestamp", "type", "payload": {...}}`
//! - bare (older CLI versions): the payload object itself, with a header
//!   line `{"id", "timestamp", "instructions"}` first
//!
//! Payload types:
//! - session_meta: Session metadata (id, cwd, timestamp)
//! - message: user/assistant turns (developer/system are skipped)
//! - function_call, custom_tool_call, local_shell_call, web_search_call: tool calls
//! - reasoning, *_output, event_msg, turn_context, compacted: Skipped

use crate::content::{codex_has_text, codex_text, cwd_from_environment_context, is_environment_context};
use crate::record::{read_records, str_field};
use crate::sessions::{Message, Role, SessionSummary, Source, Timestamp};
use crate::text::{preview, PREVIEW_LIMIT};
use crate::tools::ToolCallNormalizer;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Project shown when a session carries no working directory at all
pub const UNKNOWN_PROJECT: &str = "codex";

/// Leading visible entries that are Codex bootstrap context, not conversation
const BOOTSTRAP_MESSAGES: usize = 2;

/// A Codex record after unwrapping its envelope
enum CodexItem<'a> {
    Header {
        id: Option<&'a str>,
        timestamp: Option<Timestamp>,
        cwd: Option<&'a str>,
    },
    Message {
        role: Role,
        content: &'a Value,
        timestamp: Option<Timestamp>,
        id: Option<&'a str>,
    },
    ToolCall {
        name: &'a str,
        payload: &'a Value,
        fallback: Option<&'static str>,
        call_id: Option<&'a str>,
        timestamp: Option<Timestamp>,
    },
    Other,
}

/// Split a record into (payload, envelope type, envelope timestamp).
fn unwrap_record(record: &Value) -> (&Value, Option<&str>, Option<Timestamp>) {
    match record.get("payload") {
        Some(payload) if payload.is_object() => (
            payload,
            record.get("type").and_then(Value::as_str),
            record.get("timestamp").and_then(Timestamp::from_value),
        ),
        _ => (record, None, None),
    }
}

fn classify(record: &Value) -> CodexItem<'_> {
    let (inner, envelope_type, envelope_ts) = unwrap_record(record);
    let inner_type = inner.get("type").and_then(Value::as_str);
    let timestamp = inner
        .get("timestamp")
        .and_then(Timestamp::from_value)
        .or(envelope_ts);

    let is_header = envelope_type == Some("session_meta")
        || inner_type == Some("session_meta")
        || (envelope_type.is_none() && inner_type.is_none() && str_field(inner, "id").is_some());
    if is_header {
        return CodexItem::Header {
            id: str_field(inner, "id"),
            timestamp,
            cwd: str_field(inner, "cwd"),
        };
    }

    // Envelopes other than response_item duplicate or annotate the transcript
    if matches!(envelope_type, Some(t) if t != "response_item") {
        return CodexItem::Other;
    }

    let call_id = str_field(inner, "call_id");
    match inner_type.unwrap_or("") {
        "message" => {
            let role = inner.get("role").and_then(Value::as_str).and_then(Role::parse);
            match role {
                Some(role) => CodexItem::Message {
                    role,
                    content: inner.get("content").unwrap_or(&Value::Null),
                    timestamp,
                    id: str_field(inner, "id"),
                },
                // developer/system prompts
                None => CodexItem::Other,
            }
        }
        "function_call" => CodexItem::ToolCall {
            name: str_field(inner, "name").unwrap_or("unknown"),
            payload: inner.get("arguments").unwrap_or(&Value::Null),
            fallback: None,
            call_id,
            timestamp,
        },
        "custom_tool_call" => CodexItem::ToolCall {
            name: str_field(inner, "name").unwrap_or("unknown"),
            payload: inner.get("input").unwrap_or(&Value::Null),
            fallback: None,
            call_id,
            timestamp,
        },
        "local_shell_call" => CodexItem::ToolCall {
            name: "local_shell",
            payload: inner.get("action").unwrap_or(&Value::Null),
            fallback: None,
            call_id,
            timestamp,
        },
        "web_search_call" => CodexItem::ToolCall {
            name: "web_search",
            payload: inner.get("action").unwrap_or(&Value::Null),
            fallback: Some("web search"),
            call_id: call_id.or_else(|| str_field(inner, "id")),
            timestamp,
        },
        other => {
            debug!("Skipping Codex response_item type: {}", other);
            CodexItem::Other
        }
    }
}

/// Extract session UUID from Codex filename
/// "rollout-2026-02-03T02-32-13-019c2157-e0e9-7bb2-a886-d3b1a9e24d4f.jsonl"
/// -> "019c2157-e0e9-7bb2-a886-d3b1a9e24d4f"
pub fn extract_session_id(filename: &str) -> Option<String> {
    let name = filename.strip_suffix(".jsonl")?;

    // UUID format: 8-4-4-4-12 in the last 5 dash-separated segments
    let parts: Vec<&str> = name.split('-').collect();
    if parts.len() < 6 || !name.starts_with("rollout-") {
        return None;
    }
    let uuid_parts = &parts[parts.len() - 5..];
    let lengths: Vec<usize> = uuid_parts.iter().map(|p| p.len()).collect();
    if lengths != [8, 4, 4, 4, 12] {
        return None;
    }
    Some(uuid_parts.join("-"))
}

/// Find every session file under the sessions root, at any depth.
pub fn discover(sessions_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(sessions_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Error walking Codex sessions: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|e| e == "jsonl"))
        .collect()
}

/// Summarize every session under the sessions root. Unreadable files are
/// logged and skipped.
pub fn scan_sessions(sessions_dir: &Path) -> Vec<SessionSummary> {
    let mut sessions = Vec::new();
    for path in discover(sessions_dir) {
        match summarize(sessions_dir, &path) {
            Ok(summary) => sessions.push(summary),
            Err(e) => warn!("Skipping Codex session {}: {}", path.display(), e),
        }
    }
    debug!("Found {} Codex sessions", sessions.len());
    sessions
}

/// Build the list entry for one session file.
pub fn summarize(sessions_dir: &Path, path: &Path) -> io::Result<SessionSummary> {
    let records = read_records(path)?;
    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();

    let mut header: Option<(Option<&str>, Option<Timestamp>, Option<&str>)> = None;
    let mut context_cwd: Option<String> = None;
    let mut display: Option<String> = None;

    for record in &records {
        match classify(record) {
            CodexItem::Header { id, timestamp, cwd } if header.is_none() => {
                header = Some((id, timestamp, cwd));
            }
            CodexItem::Message {
                role: Role::User,
                content,
                ..
            } => {
                let text = codex_text(content);
                if is_environment_context(&text) {
                    if context_cwd.is_none() {
                        context_cwd = cwd_from_environment_context(&text);
                    }
                } else if display.is_none() && !text.trim().is_empty() {
                    display = Some(preview(text.trim(), PREVIEW_LIMIT));
                }
            }
            _ => {}
        }
    }

    let (header_id, header_ts, header_cwd) = header.unwrap_or((None, None, None));
    let id = header_id
        .map(str::to_string)
        .or_else(|| extract_session_id(filename))
        .unwrap_or_else(|| filename.trim_end_matches(".jsonl").to_string());
    let project = header_cwd
        .map(str::to_string)
        .or(context_cwd)
        .unwrap_or_else(|| UNKNOWN_PROJECT.to_string());
    let locator = path
        .strip_prefix(sessions_dir)
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| filename.to_string());

    Ok(SessionSummary {
        source: Source::Codex,
        id,
        timestamp: header_ts.and_then(|t| t.to_millis()).unwrap_or(0),
        display: display.unwrap_or_default(),
        project,
        locator,
        message_count: count_messages(&records),
    })
}

/// Expand one session file into its visible messages.
pub fn load_messages(path: &Path, normalizer: &ToolCallNormalizer) -> io::Result<Vec<Message>> {
    let records = read_records(path)?;
    Ok(build_messages(&records, normalizer))
}

fn build_messages(records: &[Value], normalizer: &ToolCallNormalizer) -> Vec<Message> {
    let mut messages: Vec<Message> = Vec::new();
    let mut last_assistant: Option<usize> = None;

    for record in records {
        match classify(record) {
            CodexItem::Message {
                role,
                content,
                timestamp,
                id,
            } => {
                messages.push(Message::new(role, codex_text(content), timestamp, id.map(str::to_string)));
                if role == Role::Assistant {
                    last_assistant = Some(messages.len() - 1);
                }
            }
            CodexItem::ToolCall {
                name,
                payload,
                fallback,
                call_id,
                timestamp,
            } => {
                let tool = normalizer.normalize(name, payload, fallback, call_id);
                let idx = match last_assistant {
                    Some(idx) => idx,
                    None => {
                        // Tool call before any assistant text
                        messages.push(Message::new(Role::Assistant, String::new(), timestamp, None));
                        messages.len() - 1
                    }
                };
                last_assistant = Some(idx);
                messages[idx].tool_uses.push(tool);
            }
            CodexItem::Header { .. } | CodexItem::Other => {}
        }
    }

    messages
        .into_iter()
        .filter(Message::is_visible)
        .skip(BOOTSTRAP_MESSAGES)
        .collect()
}

/// Same reduction as `build_messages`, tracking only visibility.
fn count_messages(records: &[Value]) -> usize {
    let mut visible: Vec<bool> = Vec::new();
    let mut last_assistant: Option<usize> = None;

    for record in records {
        match classify(record) {
            CodexItem::Message { role, content, .. } => {
                visible.push(codex_has_text(content));
                if role == Role::Assistant {
                    last_assistant = Some(visible.len() - 1);
                }
            }
            CodexItem::ToolCall { .. } => {
                let idx = *last_assistant.get_or_insert_with(|| {
                    visible.push(false);
                    visible.len() - 1
                });
                visible[idx] = true;
            }
            CodexItem::Header { .. } | CodexItem::Other => {}
        }
    }

    visible
        .into_iter()
        .filter(|v| *v)
        .count()
        .saturating_sub(BOOTSTRAP_MESSAGES)
}
