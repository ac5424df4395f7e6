//! Configuration loader with dual-location support
//!
//! Loads configuration from:
//! 1. Default values
//! 2. User-level config: ~/.recruitflow/recruitflow.toml
//! 3. Project-level config: ./.recruitflow/recruitflow.toml
//!
//! Later files override earlier ones key by key.

use crate::config::schema::RecruitConfig;
use crate::error::{RecruitError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const CONFIG_DIR: &str = ".recruitflow";
const CONFIG_FILE: &str = "recruitflow.toml";

pub struct ConfigLoader {
    user_config_path: Option<PathBuf>,
    project_config_path: PathBuf,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            user_config_path: dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE)),
            project_config_path: PathBuf::from(CONFIG_DIR).join(CONFIG_FILE),
        }
    }

    /// Loader reading from explicit locations
    pub fn with_paths(user_config_path: Option<PathBuf>, project_config_path: PathBuf) -> Self {
        Self {
            user_config_path,
            project_config_path,
        }
    }

    /// Merge defaults, user config and project config, then expand `${VAR}`
    /// references. Missing files are skipped; malformed ones are errors.
    pub async fn load(&self) -> Result<RecruitConfig> {
        let mut merged = toml::Table::new();

        let layers = self.user_config_path.iter().chain(std::iter::once(&self.project_config_path));
        for path in layers {
            if !path.exists() {
                debug!(path = %path.display(), "Config file not found, skipping");
                continue;
            }
            let layer = Self::read_table(path).await?;
            merge_tables(&mut merged, layer);
            debug!(path = %path.display(), "Loaded config layer");
        }

        let mut config: RecruitConfig = toml::Value::Table(merged)
            .try_into()
            .map_err(|e| RecruitError::Config(format!("Invalid configuration: {}", e)))?;
        config.resolve_env_vars();

        info!("Configuration loaded");
        Ok(config)
    }

    /// Load a single explicit file over the defaults
    pub async fn load_file(path: &Path) -> Result<RecruitConfig> {
        if !path.exists() {
            return Err(RecruitError::Config(format!("Config file not found: {}", path.display())));
        }
        let table = Self::read_table(path).await?;
        let mut config: RecruitConfig = toml::Value::Table(table)
            .try_into()
            .map_err(|e| RecruitError::Config(format!("Invalid configuration in {}: {}", path.display(), e)))?;
        config.resolve_env_vars();
        Ok(config)
    }

    async fn read_table(path: &Path) -> Result<toml::Table> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| RecruitError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| RecruitError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    pub fn user_config_path(&self) -> Option<&Path> {
        self.user_config_path.as_deref()
    }

    pub fn project_config_path(&self) -> &Path {
        &self.project_config_path
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively overlay `layer` onto `base`; nested tables merge, everything
/// else is replaced
fn merge_tables(base: &mut toml::Table, layer: toml::Table) {
    for (key, value) in layer {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}
