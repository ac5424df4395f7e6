//! Configuration schema for recruitflow

use crate::state::WorkflowLimits;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use workflow_core::{EngineConfig, RetryPolicy};

/// Main recruitflow configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RecruitConfig {
    /// Checkpoint storage
    pub database: DatabaseConfig,

    /// Execution loop tuning
    pub engine: EngineSettings,

    /// Pipeline thresholds captured into each new job
    pub workflow: WorkflowLimits,

    /// Collaborator feature flags and endpoints
    pub capabilities: CapabilitiesConfig,

    /// Backoff for transient collaborator failures
    pub retry: RetryPolicy,

    pub logging: LoggingConfig,

    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,

    /// Database file path (relative to ~/.recruitflow or absolute)
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: "recruitflow.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub node_timeout_secs: u64,
    pub lock_ttl_secs: u64,
    /// Zero fails fast on a busy job
    pub lock_wait_ms: u64,
    pub max_steps: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            node_timeout_secs: 120,
            lock_ttl_secs: 300,
            lock_wait_ms: 0,
            max_steps: 64,
        }
    }
}

impl EngineSettings {
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            node_timeout: Duration::from_secs(self.node_timeout_secs),
            lock_ttl: Duration::from_secs(self.lock_ttl_secs),
            lock_wait: Duration::from_millis(self.lock_wait_ms),
            max_steps: self.max_steps,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilitiesConfig {
    pub voice_prescreening: bool,
    pub interview_scheduling: bool,

    /// Prefix of published posting references
    pub careers_base_url: String,

    /// Meeting links are generated only when set
    pub meeting_base_url: Option<String>,
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self {
            voice_prescreening: false,
            interview_scheduling: false,
            careers_base_url: "/careers".to_string(),
            meeting_base_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl RecruitConfig {
    /// Resolve `${VAR_NAME}` references in string values
    pub fn resolve_env_vars(&mut self) {
        self.database.path = expand_env_vars(&self.database.path);
        self.capabilities.careers_base_url = expand_env_vars(&self.capabilities.careers_base_url);
        if let Some(url) = &self.capabilities.meeting_base_url {
            self.capabilities.meeting_base_url = Some(expand_env_vars(url));
        }
        self.server.host = expand_env_vars(&self.server.host);
    }

    /// Resolved database path. Relative paths live under ~/.recruitflow.
    pub fn database_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.database.path);
        if path.is_absolute() {
            return path;
        }
        match dirs::home_dir() {
            Some(home) => home.join(".recruitflow").join(path),
            None => path,
        }
    }
}

/// Replace every `${VAR}` with its environment value. Unset variables are
/// left verbatim.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(resolved) => out.push_str(&resolved),
                    Err(_) => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RecruitConfig::default();
        assert_eq!(config.database.backend, StoreBackend::Sqlite);
        assert_eq!(config.database.path, "recruitflow.db");
        assert_eq!(config.workflow.min_applicants, 5);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(!config.capabilities.voice_prescreening);
        assert_eq!(config.server.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: RecruitConfig = toml::from_str(
            r#"
[workflow]
min_applicants = 3

[capabilities]
voice_prescreening = true
"#,
        )
        .unwrap();
        assert_eq!(config.workflow.min_applicants, 3);
        assert_eq!(config.workflow.shortlist_size, 5);
        assert!(config.capabilities.voice_prescreening);
        assert_eq!(config.capabilities.careers_base_url, "/careers");
    }

    #[test]
    fn test_engine_settings_convert() {
        let engine = EngineSettings {
            node_timeout_secs: 5,
            lock_ttl_secs: 10,
            lock_wait_ms: 250,
            max_steps: 8,
        }
        .to_engine_config();
        assert_eq!(engine.node_timeout, Duration::from_secs(5));
        assert_eq!(engine.lock_wait, Duration::from_millis(250));
        assert_eq!(engine.max_steps, 8);
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("RECRUITFLOW_TEST_HOST", "meet.example.com");
        assert_eq!(
            expand_env_vars("https://${RECRUITFLOW_TEST_HOST}/rooms"),
            "https://meet.example.com/rooms"
        );
        assert_eq!(expand_env_vars("${RECRUITFLOW_UNSET_VAR_X}"), "${RECRUITFLOW_UNSET_VAR_X}");
        assert_eq!(expand_env_vars("no vars"), "no vars");
        assert_eq!(expand_env_vars("broken ${OPEN"), "broken ${OPEN");
    }

    #[test]
    fn test_absolute_database_path_kept() {
        let mut config = RecruitConfig::default();
        config.database.path = "/var/lib/recruitflow/jobs.db".to_string();
        assert_eq!(config.database_path(), PathBuf::from("/var/lib/recruitflow/jobs.db"));
    }
}
