//! Display text extraction from message `content` fields.
//!
//! Claude content is a string or an array of typed blocks where only
//! `{"type":"text"}` blocks carry display text. Codex content is an array of
//! `input_text` / `output_text` blocks, so any block with a text-like key
//! counts.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Keys that hold display text in Codex content blocks
const CODEX_TEXT_KEYS: &[&str] = &["text", "input_text", "output_text"];

/// Codex injects its sandbox/cwd description as a user message with this tag
pub const ENVIRONMENT_CONTEXT_TAG: &str = "<environment_context>";
const USER_INSTRUCTIONS_TAG: &str = "<user_instructions>";

static CWD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<cwd>\s*([^<]+?)\s*</cwd>").expect("static regex"));

/// Join text blocks with a blank line, preserving order.
fn join_blocks<'a>(texts: impl Iterator<Item = &'a str>) -> String {
    texts
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Claude: string passes through, arrays keep only `type == "text"` blocks.
pub fn claude_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => join_blocks(blocks.iter().filter_map(|block| {
            if block.get("type")?.as_str()? == "text" {
                block.get("text")?.as_str()
            } else {
                None
            }
        })),
        _ => String::new(),
    }
}

/// Cheap check used by the list path: does `claude_text` produce anything?
pub fn claude_has_text(content: &Value) -> bool {
    match content {
        Value::String(s) => !s.is_empty(),
        Value::Array(blocks) => blocks.iter().any(|block| {
            block.get("type").and_then(Value::as_str) == Some("text")
                && block.get("text").and_then(Value::as_str).is_some_and(|t| !t.is_empty())
        }),
        _ => false,
    }
}

fn codex_block_text(block: &Value) -> Option<&str> {
    CODEX_TEXT_KEYS
        .iter()
        .find_map(|key| block.get(*key).and_then(Value::as_str))
}

/// Codex: string passes through, arrays keep any block exposing a text key.
pub fn codex_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => join_blocks(blocks.iter().filter_map(codex_block_text)),
        _ => String::new(),
    }
}

pub fn codex_has_text(content: &Value) -> bool {
    match content {
        Value::String(s) => !s.is_empty(),
        Value::Array(blocks) => blocks
            .iter()
            .filter_map(codex_block_text)
            .any(|t| !t.is_empty()),
        _ => false,
    }
}

/// Codex bootstrap chatter that should never become a session preview.
pub fn is_environment_context(text: &str) -> bool {
    text.contains(ENVIRONMENT_CONTEXT_TAG) || text.trim_start().starts_with(USER_INSTRUCTIONS_TAG)
}

/// Working directory mined from an `<environment_context>` block.
pub fn cwd_from_environment_context(text: &str) -> Option<String> {
    if !text.contains(ENVIRONMENT_CONTEXT_TAG) {
        return None;
    }
    CWD_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|cwd| !cwd.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_claude_text_plain_string_passes_through() {
        assert_eq!(claude_text(&json!("hello\nworld")), "hello\nworld");
    }

    #[test]
    fn test_claude_text_keeps_only_text_blocks_in_order() {
        let content = json!([
            {"type": "text", "text": "first"},
            {"type": "tool_use", "id": "t1", "name": "Bash", "input": {"command": "ls"}},
            {"type": "thinking", "thinking": "hmm"},
            {"type": "text", "text": "second"}
        ]);
        assert_eq!(claude_text(&content), "first\n\nsecond");
        assert!(claude_has_text(&content));
    }

    #[test]
    fn test_claude_tool_result_only_has_no_text() {
        let content = json!([{"type": "tool_result", "tool_use_id": "t1", "content": "ok"}]);
        assert_eq!(claude_text(&content), "");
        assert!(!claude_has_text(&content));
    }

    #[test]
    fn test_codex_text_accepts_input_and_output_blocks() {
        let content = json!([
            {"type": "input_text", "text": "question"},
            {"type": "image", "image_url": "data:..."},
            {"type": "output_text", "output_text": "answer"}
        ]);
        assert_eq!(codex_text(&content), "question\n\nanswer");
        assert!(codex_has_text(&content));
        assert!(!codex_has_text(&json!([{"type": "image"}])));
    }

    #[test]
    fn test_environment_context_detection() {
        assert!(is_environment_context("<environment_context>\n  <cwd>/x</cwd>"));
        assert!(is_environment_context("  <user_instructions>be nice</user_instructions>"));
        assert!(is_environment_context("note\n<environment_context></environment_context>"));
        assert!(!is_environment_context("fix the bug in <cwd> handling"));
    }

    #[test]
    fn test_cwd_from_environment_context() {
        let text = "<environment_context>\n  <cwd>/home/me/app</cwd>\n  <approval_policy>never</approval_policy>\n</environment_context>";
        assert_eq!(cwd_from_environment_context(text), Some("/home/me/app".to_string()));
        assert_eq!(cwd_from_environment_context("<cwd>/nope</cwd>"), None);
    }
}
