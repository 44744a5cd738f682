//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;

/// Error type for configuration loading and route compilation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("entry #{index}: path cannot be empty")]
    EmptyPath { index: usize },

    #[error("entry {path}: cmd cannot be empty")]
    EmptyCommand { path: String },
}

/// Load configuration from a YAML or TOML file.
///
/// The format is picked by extension: `.toml` is TOML, everything else YAML.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);

    if is_toml {
        Ok(toml::from_str(&content)?)
    } else {
        parse_yaml(&content)
    }
}

/// Parse a YAML document. An empty document is an empty config.
pub fn parse_yaml(content: &str) -> Result<GatewayConfig, ConfigError> {
    if content.trim().is_empty() {
        return Ok(GatewayConfig::default());
    }
    Ok(serde_yaml::from_str(content)?)
}
