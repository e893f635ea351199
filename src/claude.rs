//! Parse Claude Code sessions from ~/.claude/projects/
//!
//! Claude stores one directory per project, named after the project path
//! with `/` replaced by `-`:
//! ~/.claude/projects/-home-user-my-app/{session_id}.jsonl
//!
//! Record types:
//! - user, assistant: conversation turns (`message.content` is a string or blocks)
//! - file-history-snapshot: tracked-file backups, keyed by the message they belong to
//! - summary, system, progress, ...: skipped
//!
//! Files named `agent-*.jsonl` are internal subagent sessions and are ignored.

use crate::content::{claude_has_text, claude_text};
use crate::record::{read_records, str_field};
use crate::sessions::{Message, Role, SessionSummary, SnapshotRef, Source, Timestamp, TrackedFile};
use crate::text::{preview, PREVIEW_LIMIT};
use crate::tools::ToolCallNormalizer;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Session files with this prefix are subagent transcripts
pub const RESERVED_PREFIX: &str = "agent-";

const SNAPSHOT_TYPE: &str = "file-history-snapshot";

/// A Claude record resolved once at decode time
enum ClaudeRecord<'a> {
    Turn {
        role: Role,
        message: &'a Value,
        timestamp: Option<Timestamp>,
        uuid: Option<&'a str>,
    },
    Snapshot(SnapshotRef),
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRecord {
    message_id: Option<String>,
    #[serde(default)]
    is_snapshot_update: bool,
    snapshot: Option<RawSnapshot>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    message_id: Option<String>,
    timestamp: Option<Value>,
    #[serde(default)]
    tracked_file_backups: BTreeMap<String, TrackedFile>,
}

fn classify(record: &Value) -> ClaudeRecord<'_> {
    let record_type = record.get("type").and_then(Value::as_str).unwrap_or("");
    if record_type == SNAPSHOT_TYPE {
        return parse_snapshot(record).map_or(ClaudeRecord::Other, ClaudeRecord::Snapshot);
    }
    let Some(role) = Role::parse(record_type) else {
        return ClaudeRecord::Other;
    };
    match record.get("message") {
        Some(message) if !message.is_null() => ClaudeRecord::Turn {
            role,
            message,
            timestamp: record.get("timestamp").and_then(Timestamp::from_value),
            uuid: str_field(record, "uuid"),
        },
        _ => ClaudeRecord::Other,
    }
}

fn parse_snapshot(record: &Value) -> Option<SnapshotRef> {
    let parsed = match SnapshotRecord::deserialize(record) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Skipping malformed file-history snapshot: {}", e);
            return None;
        }
    };
    let snapshot = parsed.snapshot?;
    let message_id = parsed.message_id.or(snapshot.message_id)?;
    Some(SnapshotRef {
        message_id,
        timestamp: snapshot.timestamp.as_ref().and_then(Timestamp::from_value),
        is_update: parsed.is_snapshot_update,
        tracked_files: snapshot.tracked_file_backups,
    })
}

/// Reconstruct a project path from its directory name
/// e.g., "-home-user-app" -> "/home/user/app"
pub fn project_path_from_dir(dir_name: &str) -> String {
    format!("/{}", dir_name.trim_start_matches('-').replace('-', "/"))
}

/// Find every main session file: `<projects_dir>/<project>/<id>.jsonl`
///
/// Symlinked project dirs and session files are skipped, matching the
/// containment check in detail lookups.
pub fn discover(projects_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for project_entry in fs::read_dir(projects_dir)?.flatten() {
        if !project_entry.file_type().is_ok_and(|t| t.is_dir()) {
            continue;
        }
        let project_path = project_entry.path();
        let entries = match fs::read_dir(&project_path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read Claude project dir {}: {}", project_path.display(), e);
                continue;
            }
        };
        for entry in entries.flatten() {
            if !entry.file_type().is_ok_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            if path.extension().map_or(true, |e| e != "jsonl") {
                continue;
            }
            let is_reserved = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map_or(true, |stem| stem.starts_with(RESERVED_PREFIX));
            if !is_reserved {
                files.push(path);
            }
        }
    }
    Ok(files)
}

/// Summarize every session under the projects dir. Unreadable files are
/// logged and skipped.
pub fn scan_sessions(projects_dir: &Path) -> io::Result<Vec<SessionSummary>> {
    let mut sessions = Vec::new();
    for path in discover(projects_dir)? {
        match summarize(projects_dir, &path) {
            Ok(summary) => sessions.push(summary),
            Err(e) => warn!("Skipping Claude session {}: {}", path.display(), e),
        }
    }
    debug!("Found {} Claude sessions", sessions.len());
    Ok(sessions)
}

/// Build the list entry for one session file.
pub fn summarize(projects_dir: &Path, path: &Path) -> io::Result<SessionSummary> {
    let records = read_records(path)?;

    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let project_dir = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let locator = path
        .strip_prefix(projects_dir)
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| format!("{}/{}.jsonl", project_dir, id));

    let first_user = records.iter().find_map(|record| match classify(record) {
        ClaudeRecord::Turn {
            role: Role::User,
            message,
            timestamp,
            ..
        } => Some((message, timestamp)),
        _ => None,
    });
    let (display, timestamp) = match first_user {
        Some((message, timestamp)) => {
            let text = message.get("content").map(claude_text).unwrap_or_default();
            (
                preview(text.trim(), PREVIEW_LIMIT),
                timestamp.and_then(|t| t.to_millis()).unwrap_or(0),
            )
        }
        None => (String::new(), 0),
    };

    Ok(SessionSummary {
        source: Source::Claude,
        id,
        timestamp,
        display,
        project: project_path_from_dir(project_dir),
        locator,
        message_count: count_messages(&records),
    })
}

/// Expand one session file into its visible messages.
pub fn load_messages(path: &Path, normalizer: &ToolCallNormalizer) -> io::Result<Vec<Message>> {
    let records = read_records(path)?;
    Ok(build_messages(&records, normalizer))
}

/// Snapshots keyed by the message they were taken for. Every version is
/// kept, in file order.
fn snapshot_index(records: &[Value]) -> HashMap<String, Vec<SnapshotRef>> {
    let mut index: HashMap<String, Vec<SnapshotRef>> = HashMap::new();
    for record in records {
        if let ClaudeRecord::Snapshot(snapshot) = classify(record) {
            index
                .entry(snapshot.message_id.clone())
                .or_default()
                .push(snapshot);
        }
    }
    index
}

fn build_messages(records: &[Value], normalizer: &ToolCallNormalizer) -> Vec<Message> {
    let snapshots = snapshot_index(records);
    let mut messages = Vec::new();

    for record in records {
        let ClaudeRecord::Turn {
            role,
            message,
            timestamp,
            uuid,
        } = classify(record)
        else {
            continue;
        };

        let content = message.get("content").unwrap_or(&Value::Null);
        let mut msg = Message::new(role, claude_text(content), timestamp, uuid.map(str::to_string));

        if role == Role::Assistant {
            msg.tool_uses = tool_use_blocks(content)
                .map(|block| {
                    normalizer.normalize(
                        block.get("name").and_then(Value::as_str).unwrap_or("unknown"),
                        block.get("input").unwrap_or(&Value::Null),
                        None,
                        block.get("id").and_then(Value::as_str),
                    )
                })
                .collect();
        }

        // Streamed chunks can share a uuid; each carries the full list
        if let Some(list) = uuid.and_then(|id| snapshots.get(id)) {
            msg.file_snapshots = list.clone();
        }

        if msg.is_visible() {
            messages.push(msg);
        }
    }

    messages
}

fn tool_use_blocks(content: &Value) -> impl Iterator<Item = &Value> {
    content
        .as_array()
        .into_iter()
        .flatten()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("tool_use"))
}

/// Same visibility rule as `build_messages`, without building any strings.
fn count_messages(records: &[Value]) -> usize {
    let snapshot_ids: HashSet<String> = records
        .iter()
        .filter_map(|record| match classify(record) {
            ClaudeRecord::Snapshot(snapshot) => Some(snapshot.message_id),
            _ => None,
        })
        .collect();

    records
        .iter()
        .filter(|record| match classify(record) {
            ClaudeRecord::Turn {
                role,
                message,
                uuid,
                ..
            } => {
                let content = message.get("content").unwrap_or(&Value::Null);
                claude_has_text(content)
                    || (role == Role::Assistant && tool_use_blocks(content).next().is_some())
                    || uuid.is_some_and(|id| snapshot_ids.contains(id))
            }
            _ => false,
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_session(dir: &Path, project: &str, id: &str, lines: &[String]) -> PathBuf {
        let project_dir = dir.join(project);
        fs::create_dir_all(&project_dir).unwrap();
        let path = project_dir.join(format!("{}.jsonl", id));
        let mut file = fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    fn sample_lines() -> Vec<String> {
        vec![
            json!({"type": "summary", "summary": "Listing files"}).to_string(),
            json!({
                "type": "file-history-snapshot",
                "messageId": "u1",
                "isSnapshotUpdate": false,
                "snapshot": {
                    "messageId": "u1",
                    "timestamp": "2026-01-05T10:00:00Z",
                    "trackedFileBackups": {
                        "/repo/a.rs": {"backupFileName": "abc@v1", "version": 1, "backupTime": "2026-01-05T10:00:00Z"}
                    }
                }
            })
            .to_string(),
            json!({
                "type": "user", "uuid": "u1", "timestamp": "2026-01-05T10:00:00Z",
                "message": {"role": "user", "content": "list the files please"}
            })
            .to_string(),
            "{not json".to_string(),
            json!({
                "type": "assistant", "uuid": "a1", "timestamp": "2026-01-05T10:00:02Z",
                "message": {"role": "assistant", "content": [
                    {"type": "text", "text": "Sure."},
                    {"type": "tool_use", "id": "toolu_1", "name": "Bash", "input": {"command": "ls -la"}}
                ]}
            })
            .to_string(),
            json!({
                "type": "user", "uuid": "u2", "timestamp": "2026-01-05T10:00:03Z",
                "message": {"role": "user", "content": [
                    {"type": "tool_result", "tool_use_id": "toolu_1", "content": "a.rs"}
                ]}
            })
            .to_string(),
            json!({
                "type": "file-history-snapshot",
                "messageId": "u1",
                "isSnapshotUpdate": true,
                "snapshot": {"messageId": "u1", "timestamp": "2026-01-05T10:00:04Z", "trackedFileBackups": {}}
            })
            .to_string(),
            json!({"type": "assistant", "uuid": "a2", "message": null}).to_string(),
        ]
    }

    #[test]
    fn test_project_path_from_dir() {
        assert_eq!(project_path_from_dir("-home-user-app"), "/home/user/app");
        assert_eq!(project_path_from_dir("-"), "/");
    }

    #[test]
    fn test_build_messages_joins_snapshots_and_tools() {
        let records: Vec<Value> = sample_lines()
            .iter()
            .filter_map(|l| crate::record::decode_line(l))
            .collect();
        let messages = build_messages(&records, &ToolCallNormalizer::default());

        assert_eq!(messages.len(), 2);
        let user = &messages[0];
        assert_eq!(user.role, Role::User);
        assert_eq!(user.content, "list the files please");
        assert_eq!(user.file_snapshots.len(), 2);
        assert!(!user.file_snapshots[0].is_update);
        assert!(user.file_snapshots[1].is_update);
        assert_eq!(
            user.file_snapshots[0].tracked_files["/repo/a.rs"].backup_file_name.as_deref(),
            Some("abc@v1")
        );

        let assistant = &messages[1];
        assert_eq!(assistant.content, "Sure.");
        assert_eq!(assistant.tool_uses.len(), 1);
        assert_eq!(assistant.tool_uses[0].command, "ls -la");
        assert_eq!(assistant.tool_uses[0].payload, "");
        assert_eq!(assistant.tool_uses[0].call_id.as_deref(), Some("toolu_1"));
    }

    #[test]
    fn test_snapshot_alone_keeps_empty_message() {
        let records = vec![
            json!({"type": "file-history-snapshot", "messageId": "u9",
                   "snapshot": {"messageId": "u9", "timestamp": "t", "trackedFileBackups": {}}}),
            json!({"type": "user", "uuid": "u9", "message": {"role": "user", "content": []}}),
        ];
        let messages = build_messages(&records, &ToolCallNormalizer::default());
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "");
        assert_eq!(count_messages(&records), 1);
    }

    #[test]
    fn test_summarize_uses_first_user_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_session(dir.path(), "-home-me-repo", "sess-1", &sample_lines());

        let summary = summarize(dir.path(), &path).unwrap();
        assert_eq!(summary.id, "sess-1");
        assert_eq!(summary.source, Source::Claude);
        assert_eq!(summary.display, "list the files please");
        assert_eq!(summary.timestamp, 1_767_607_200_000);
        assert_eq!(summary.project, "/home/me/repo");
        assert_eq!(summary.locator, "-home-me-repo/sess-1.jsonl");
    }

    #[test]
    fn test_summary_count_matches_detail() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_session(dir.path(), "-p", "s", &sample_lines());

        let summary = summarize(dir.path(), &path).unwrap();
        let messages = load_messages(&path, &ToolCallNormalizer::default()).unwrap();
        let detail_count = messages
            .iter()
            .filter(|m| matches!(m.role, Role::User | Role::Assistant))
            .count();
        assert_eq!(summary.message_count, detail_count);
    }

    #[test]
    fn test_preview_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let long = "word ".repeat(60);
        let line = json!({"type": "user", "message": {"content": long}}).to_string();
        let path = write_session(dir.path(), "-p", "long", &[line]);

        let summary = summarize(dir.path(), &path).unwrap();
        assert_eq!(summary.display.chars().count(), PREVIEW_LIMIT);
        assert_eq!(summary.timestamp, 0);
    }

    #[test]
    fn test_session_without_turns_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let lines = vec![json!({"type": "summary", "summary": "x"}).to_string(), "garbage".into()];
        let path = write_session(dir.path(), "-p", "empty", &lines);

        assert!(load_messages(&path, &ToolCallNormalizer::default()).unwrap().is_empty());
        assert_eq!(summarize(dir.path(), &path).unwrap().message_count, 0);
    }

    #[test]
    fn test_discover_skips_agent_files_and_loose_files() {
        let dir = tempfile::tempdir().unwrap();
        write_session(dir.path(), "-p", "main", &sample_lines());
        write_session(dir.path(), "-p", "agent-123", &sample_lines());
        fs::write(dir.path().join("stray.jsonl"), "{}").unwrap();
        fs::write(dir.path().join("-p").join("notes.txt"), "x").unwrap();

        let files = discover(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.jsonl"));
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_skips_symlinks() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let projects = dir.path().join("projects");
        write_session(&projects, "-p", "real", &sample_lines());
        let outside = write_session(dir.path(), "elsewhere", "s", &sample_lines());
        symlink(&outside, projects.join("-p").join("s.jsonl")).unwrap();
        symlink(dir.path().join("elsewhere"), projects.join("-linked")).unwrap();

        let files = discover(&projects).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("real.jsonl"));

        let ids: Vec<String> = scan_sessions(&projects).unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["real"]);
    }
}
