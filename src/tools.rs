//! Tool call normalization.
//!
//! Claude `tool_use` inputs are JSON objects, Codex `function_call` arguments
//! are JSON-encoded strings and `custom_tool_call` inputs are raw text. All of
//! them become a [`ToolUse`] whose `command` is the most human-readable field
//! we can find.

use crate::sessions::ToolUse;
use crate::text::{truncate, COMMAND_LIMIT, PAYLOAD_LIMIT};
use serde_json::Value;

/// Keys searched for a command string, highest priority first.
pub const DEFAULT_COMMAND_KEYS: &[&str] = &[
    "command",
    "cmd",
    "patch",
    "script",
    "code",
    "query",
    "pattern",
    "file_path",
    "path",
    "url",
    "prompt",
    "description",
];

/// Object levels searched, counting the payload root as level 0 (so 0..=3)
const MAX_SEARCH_DEPTH: usize = 4;

#[derive(Debug, Clone)]
pub struct ToolCallNormalizer {
    command_keys: Vec<String>,
}

impl Default for ToolCallNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_KEYS.iter().map(|k| k.to_string()).collect())
    }
}

/// A command string and, when it sat directly on the root object, its key
struct Found {
    command: String,
    root_key: Option<String>,
}

impl ToolCallNormalizer {
    pub fn new(command_keys: Vec<String>) -> Self {
        Self { command_keys }
    }

    /// Normalize one tool invocation.
    ///
    /// `payload` may be an object, a JSON-encoded string or plain text.
    /// `fallback` is used as the command when nothing better is found.
    pub fn normalize(
        &self,
        name: &str,
        payload: &Value,
        fallback: Option<&str>,
        call_id: Option<&str>,
    ) -> ToolUse {
        let structured = structured_payload(payload);
        let raw = raw_text(payload);

        let found = structured.as_ref().and_then(|v| self.search(v, 0));
        let command = match (&found, &structured, &raw) {
            (Some(found), _, _) => found.command.clone(),
            (None, None, Some(raw)) if !raw.trim().is_empty() => raw.clone(),
            _ => fallback.unwrap_or_default().to_string(),
        };

        let payload_text = match &structured {
            Some(value) => {
                let mut shown = value.clone();
                if let (Some(key), Value::Object(map)) =
                    (found.as_ref().and_then(|f| f.root_key.as_deref()), &mut shown)
                {
                    map.remove(key);
                }
                match &shown {
                    Value::Object(map) if map.is_empty() => String::new(),
                    _ => serde_json::to_string_pretty(&shown).unwrap_or_default(),
                }
            }
            None => raw.unwrap_or_default(),
        };
        let payload_text = if payload_text == command {
            String::new()
        } else {
            payload_text
        };

        ToolUse {
            name: name.to_string(),
            command: truncate(&command, COMMAND_LIMIT),
            payload: truncate(&payload_text, PAYLOAD_LIMIT),
            call_id: call_id.filter(|id| !id.is_empty()).map(str::to_string),
        }
    }

    /// Depth-first search: each object checks the priority keys before
    /// descending into its children.
    fn search(&self, value: &Value, depth: usize) -> Option<Found> {
        if depth >= MAX_SEARCH_DEPTH {
            return None;
        }
        match value {
            Value::Object(map) => {
                for key in &self.command_keys {
                    if let Some(command) = map.get(key.as_str()).and_then(command_string) {
                        let root_key = (depth == 0).then(|| key.clone());
                        return Some(Found { command, root_key });
                    }
                }
                map.values()
                    .filter(|v| v.is_object() || v.is_array())
                    .find_map(|v| self.search(v, depth + 1))
                    .map(|found| Found {
                        command: found.command,
                        root_key: None,
                    })
            }
            Value::Array(items) => items
                .iter()
                .find_map(|v| self.search(v, depth + 1))
                .map(|found| Found {
                    command: found.command,
                    root_key: None,
                }),
            _ => None,
        }
    }
}

/// Objects and arrays, either given directly or JSON-encoded in a string
fn structured_payload(payload: &Value) -> Option<Value> {
    match payload {
        Value::Object(_) | Value::Array(_) => Some(payload.clone()),
        Value::String(s) => serde_json::from_str::<Value>(s)
            .ok()
            .filter(|v| v.is_object() || v.is_array()),
        _ => None,
    }
}

fn raw_text(payload: &Value) -> Option<String> {
    match payload {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A non-empty string, or an argv-style array of strings joined by spaces
fn command_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) if !items.is_empty() => {
            let parts: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
            parts
                .map(|p| p.join(" "))
                .filter(|joined| !joined.trim().is_empty())
        }
        _ => None,
    }
}
