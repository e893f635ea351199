//! The merged, cross-source session list.

use crate::error::QueryError;
use crate::sessions::SessionSummary;
use crate::{claude, codex};
use std::path::Path;
use tracing::{info, warn};

/// Scan both sources and return every session, newest first.
///
/// A missing source root contributes zero sessions; only both missing is an
/// error.
pub fn list_sessions(
    claude_projects_dir: &Path,
    codex_sessions_dir: &Path,
) -> Result<Vec<SessionSummary>, QueryError> {
    let has_claude = claude_projects_dir.is_dir();
    let has_codex = codex_sessions_dir.is_dir();

    if !has_claude && !has_codex {
        return Err(QueryError::SourcesUnavailable {
            claude: claude_projects_dir.display().to_string(),
            codex: codex_sessions_dir.display().to_string(),
        });
    }

    let mut sessions = Vec::new();

    if has_claude {
        match claude::scan_sessions(claude_projects_dir) {
            Ok(found) => sessions.extend(found),
            Err(e) => warn!("Cannot scan {}: {}", claude_projects_dir.display(), e),
        }
    } else {
        warn!("Claude projects directory does not exist: {}", claude_projects_dir.display());
    }

    if has_codex {
        sessions.extend(codex::scan_sessions(codex_sessions_dir));
    } else {
        warn!("Codex sessions directory does not exist: {}", codex_sessions_dir.display());
    }

    sort_sessions(&mut sessions);
    info!("Listed {} sessions", sessions.len());
    Ok(sessions)
}

/// Newest first; equal timestamps fall back to id, then source.
pub fn sort_sessions(sessions: &mut [SessionSummary]) {
    sessions.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.id.cmp(&b.id))
            .then_with(|| a.source.as_str().cmp(b.source.as_str()))
    });
}
