use std::io;
use thiserror::Error;

/// Failures surfaced to the display layer as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Input rejected before touching the filesystem
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no session logs found (searched {claude} and {codex})")]
    SourcesUnavailable { claude: String, codex: String },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl QueryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
