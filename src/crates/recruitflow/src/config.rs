//! Configuration management for recruitflow
//!
//! Supports dual-location configuration:
//! - User-level: ~/.recruitflow/recruitflow.toml
//! - Project-level: ./.recruitflow/recruitflow.toml
//!
//! Project-level config overrides user-level config.

mod loader;
mod schema;

pub use loader::ConfigLoader;
pub use schema::{
    expand_env_vars, CapabilitiesConfig, DatabaseConfig, EngineSettings, LogFormat, LoggingConfig, RecruitConfig,
    ServerConfig, StoreBackend,
};

use crate::error::Result;

/// Load configuration from both locations with project config taking precedence
pub async fn load_config() -> Result<RecruitConfig> {
    ConfigLoader::new().load().await
}
