//! JSONL record decoding shared by both session formats.
//!
//! A line that fails to parse is dropped, never fatal: session files are
//! appended to while we read them, so a torn final line is expected.

use serde_json::Value;
use std::fs;
use std::io;
use std::path::Path;

/// Decode one JSONL line. `None` for blank, malformed or non-object lines.
pub fn decode_line(line: &str) -> Option<Value> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(line) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

/// Read every decodable record of a session file, in file order.
pub fn read_records(path: &Path) -> io::Result<Vec<Value>> {
    let bytes = fs::read(path)?;
    // A concurrent writer can leave a partial multi-byte sequence at EOF
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.lines().filter_map(decode_line).collect())
}

/// `record[key]` as a non-empty string
pub fn str_field<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}
