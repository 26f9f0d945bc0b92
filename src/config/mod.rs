//! Configuration loading and management

mod io;
mod settings;
mod tool;

pub use settings::{HttpSettings, Settings};
pub use tool::ToolConfig;
pub(crate) use tool::BUILTIN_TOOLS;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub settings: Settings,

    /// Per-analyzer overrides, keyed by tool name ("bandit", "semgrep").
    /// Tools without an entry run with their built-in defaults.
    #[serde(default)]
    pub tools: BTreeMap<String, ToolConfig>,
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.settings.expand_paths();
        Ok(config)
    }

    /// Create a config with the built-in tool entries spelled out
    pub fn with_defaults() -> Self {
        let mut config = Self::default();
        for name in BUILTIN_TOOLS {
            config
                .tools
                .insert(name.to_string(), ToolConfig::builtin(name));
        }
        config
    }

    /// Get the settings for one tool (defaults when not configured)
    pub fn tool(&self, name: &str) -> ToolConfig {
        self.tools.get(name).cloned().unwrap_or_default()
    }
}
