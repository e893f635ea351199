//! Display-safety length caps.

/// Max chars of an inferred tool command
pub const COMMAND_LIMIT: usize = 4000;
/// Max chars of a serialized tool payload
pub const PAYLOAD_LIMIT: usize = 12000;
/// Max chars of a session-list preview
pub const PREVIEW_LIMIT: usize = 100;

/// Cap `text` at `max` chars, appending a marker naming how much was cut.
///
/// Counts Unicode scalar values, so the cut point depends only on the input.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((cut, _)) => {
            let dropped = text[cut..].chars().count();
            format!("{}\n… [truncated {} chars]", &text[..cut], dropped)
        }
    }
}

/// Cap `text` at `max` chars with no marker (list previews).
pub fn preview(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
