//! Runtime configuration from environment variables.
//!
//! - `CLAUDE_CONFIG_DIR`: Claude Code root (default ~/.claude)
//! - `CODEX_HOME`: Codex CLI root (default ~/.codex)
//! - `BIND_ADDR` / `PORT`: listen address (default 127.0.0.1:4850)
//! - `STATIC_DIR`: optional display-shell assets to serve
//! - `SESSIONLENS_COMMAND_KEYS`: comma-separated tool command key priority

use crate::tools::DEFAULT_COMMAND_KEYS;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use tracing::warn;

const DEFAULT_PORT: u16 = 4850;

#[derive(Debug, Clone)]
pub struct Config {
    pub claude_dir: PathBuf,
    pub codex_dir: PathBuf,
    pub bind_addr: IpAddr,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
    pub command_keys: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let home = dirs::home_dir().unwrap_or_default();

        let port = match var("PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("Invalid PORT {:?}, using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };
        let bind_addr = match var("BIND_ADDR") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("Invalid BIND_ADDR {:?}, using 127.0.0.1", raw);
                IpAddr::V4(Ipv4Addr::LOCALHOST)
            }),
            None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };
        let command_keys = var("SESSIONLENS_COMMAND_KEYS")
            .map(|raw| {
                raw.split(',')
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|keys| !keys.is_empty())
            .unwrap_or_else(|| DEFAULT_COMMAND_KEYS.iter().map(|k| k.to_string()).collect());

        Self {
            claude_dir: var("CLAUDE_CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| home.join(".claude")),
            codex_dir: var("CODEX_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| home.join(".codex")),
            bind_addr,
            port,
            static_dir: var("STATIC_DIR").map(PathBuf::from),
            command_keys,
        }
    }

    /// ~/.claude/projects/
    pub fn projects_dir(&self) -> PathBuf {
        self.claude_dir.join("projects")
    }

    /// ~/.claude/file-history/
    pub fn file_history_dir(&self) -> PathBuf {
        self.claude_dir.join("file-history")
    }

    /// ~/.codex/sessions/
    pub fn codex_sessions_dir(&self) -> PathBuf {
        self.codex_dir.join("sessions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.bind_addr, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(cfg.projects_dir().ends_with(".claude/projects"));
        assert!(cfg.codex_sessions_dir().ends_with(".codex/sessions"));
        assert_eq!(cfg.command_keys[0], "command");
        assert!(cfg.static_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("CLAUDE_CONFIG_DIR", "/data/claude"),
            ("CODEX_HOME", "/data/codex"),
            ("PORT", "9000"),
            ("SESSIONLENS_COMMAND_KEYS", " path , command,"),
        ]);
        assert_eq!(cfg.file_history_dir(), PathBuf::from("/data/claude/file-history"));
        assert_eq!(cfg.codex_sessions_dir(), PathBuf::from("/data/codex/sessions"));
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.command_keys, vec!["path", "command"]);
    }

    #[test]
    fn test_invalid_port_falls_back() {
        assert_eq!(config(&[("PORT", "http")]).port, DEFAULT_PORT);
    }
}
