//! Strategy configuration utilities

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Load configuration from TOML file
pub fn load_config<T: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML config {}", path.display()))?;
    Ok(config)
}

/// Common plugin configuration fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasePluginConfig {
    pub name: String,
    pub enabled: bool,
    pub log_level: Option<String>,
}

impl Default for BasePluginConfig {
    fn default() -> Self {
        Self {
            name: "unnamed_plugin".to_string(),
            enabled: true,
            log_level: Some("info".to_string()),
        }
    }
}
