//! The three operations the display layer calls.
//!
//! Every call re-reads the logs from disk; nothing is cached between calls,
//! so the most recent answer is always authoritative for a growing file.
//! Paths coming from the caller are validated before any filesystem access.

use crate::config::Config;
use crate::directory;
use crate::error::QueryError;
use crate::sessions::{Message, SessionSummary, SnapshotFile, Source};
use crate::tools::ToolCallNormalizer;
use crate::{claude, codex};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Snapshot reads are capped at 2 MiB
pub const MAX_SNAPSHOT_BYTES: u64 = 2 * 1024 * 1024;

pub struct SessionQuery {
    projects_dir: PathBuf,
    file_history_dir: PathBuf,
    codex_sessions_dir: PathBuf,
    normalizer: ToolCallNormalizer,
}

impl SessionQuery {
    pub fn new(config: &Config) -> Self {
        Self {
            projects_dir: config.projects_dir(),
            file_history_dir: config.file_history_dir(),
            codex_sessions_dir: config.codex_sessions_dir(),
            normalizer: ToolCallNormalizer::new(config.command_keys.clone()),
        }
    }

    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>, QueryError> {
        directory::list_sessions(&self.projects_dir, &self.codex_sessions_dir)
    }

    pub fn session_detail(
        &self,
        session_id: &str,
        locator: &str,
        source: Source,
    ) -> Result<Vec<Message>, QueryError> {
        let base = match source {
            Source::Claude => &self.projects_dir,
            Source::Codex => &self.codex_sessions_dir,
        };
        let relative = validate_locator(locator).inspect_err(|e| {
            warn!("Rejected {} locator {:?}: {}", source, locator, e);
        })?;
        let path = resolve_under(base, relative)?;

        let messages = match source {
            Source::Claude => claude::load_messages(&path, &self.normalizer)?,
            Source::Codex => codex::load_messages(&path, &self.normalizer)?,
        };
        info!("Loaded {} session {} ({} messages)", source, session_id, messages.len());
        Ok(messages)
    }

    pub fn snapshot_file(
        &self,
        session_id: &str,
        backup_file_name: &str,
    ) -> Result<SnapshotFile, QueryError> {
        validate_file_segment("sessionId", session_id)?;
        validate_file_segment("backupFileName", backup_file_name)?;

        let relative = Path::new(session_id).join(backup_file_name);
        let path = resolve_under(&self.file_history_dir, &relative)?;
        read_capped(&path, MAX_SNAPSHOT_BYTES)
    }
}

fn has_traversal(segment: &str) -> bool {
    segment == ".." || segment == "."
}

/// Lexical check of a caller-supplied locator: relative, `.jsonl`, no `..`.
fn validate_locator(locator: &str) -> Result<&Path, QueryError> {
    if locator.is_empty() || locator.contains('\0') {
        return Err(QueryError::validation("locator is empty or contains NUL"));
    }
    if locator.starts_with('/') || locator.starts_with('\\') || locator.contains(':') {
        return Err(QueryError::validation("locator must be relative"));
    }
    if locator.split(&['/', '\\'][..]).any(has_traversal) {
        return Err(QueryError::validation("locator contains traversal segments"));
    }
    if !locator.ends_with(".jsonl") {
        return Err(QueryError::validation("locator is not a session file"));
    }
    Ok(Path::new(locator))
}

/// A single file-name component: no separators, no traversal, no NUL.
fn validate_file_segment(field: &str, value: &str) -> Result<(), QueryError> {
    let bad = value.is_empty()
        || value.contains(&['/', '\\', '\0'][..])
        || value.contains("..")
        || has_traversal(value);
    if bad {
        warn!("Rejected {} {:?}", field, value);
        return Err(QueryError::validation(format!("{field} must be a plain file name")));
    }
    Ok(())
}

/// Join `relative` onto `base`, resolve symlinks, and require the result to
/// stay inside `base` and be a regular file.
fn resolve_under(base: &Path, relative: &Path) -> Result<PathBuf, QueryError> {
    let base = fs::canonicalize(base)
        .map_err(|_| QueryError::not_found(format!("{} does not exist", base.display())))?;
    let resolved = fs::canonicalize(base.join(relative))
        .map_err(|_| QueryError::not_found(format!("{} does not exist", relative.display())))?;

    if !resolved.starts_with(&base) {
        return Err(QueryError::validation(format!(
            "{} resolves outside {}",
            relative.display(),
            base.display()
        )));
    }
    if !fs::metadata(&resolved)?.is_file() {
        return Err(QueryError::not_found(format!("{} is not a file", relative.display())));
    }
    debug!("Resolved {} -> {}", relative.display(), resolved.display());
    Ok(resolved)
}

fn read_capped(path: &Path, max_bytes: u64) -> Result<SnapshotFile, QueryError> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();

    let mut buf = Vec::with_capacity(size.min(max_bytes) as usize);
    file.take(max_bytes).read_to_end(&mut buf)?;
    let content = String::from_utf8_lossy(&buf).into_owned();

    if size > max_bytes {
        Ok(SnapshotFile {
            content,
            truncated: Some(true),
            original_bytes: Some(size),
        })
    } else {
        Ok(SnapshotFile {
            content,
            truncated: None,
            original_bytes: None,
        })
    }
}
