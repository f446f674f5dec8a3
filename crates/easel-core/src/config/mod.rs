//! Configuration types for the easel MCP server.
//!
//! Configuration is loaded from an optional YAML file (easel.yaml) and
//! overridden by environment variables. Every section has working defaults,
//! so a missing file yields a usable local configuration.
//!
//! # Configuration Files
//!
//! - **easel.yaml**: Main configuration file with MCP transport, DashScope
//!   API, and upstream database settings.

pub mod dashscope;
pub mod mcp;
pub mod upstream;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use dashscope::DashScopeConfig;
pub use mcp::{McpConfig, Transport};
pub use upstream::UpstreamConfig;

/// Complete easel configuration loaded from a file plus environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EaselConfig {
    /// MCP server configuration.
    #[serde(default)]
    pub mcp: McpConfig,

    /// DashScope image API configuration.
    #[serde(default)]
    pub dashscope: DashScopeConfig,

    /// Upstream Postgres connection.
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl EaselConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration and apply environment overrides.
    ///
    /// Missing files are not an error: defaults are used instead, so the
    /// server can run entirely from environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };

        config.dashscope.apply_env();
        config.upstream.apply_env();
        Ok(config)
    }
}
