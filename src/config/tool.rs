use serde::{Deserialize, Serialize};

/// Analyzers shipped with reposcan, in invocation order
pub(crate) const BUILTIN_TOOLS: [&str; 2] = ["bandit", "semgrep"];

/// Configuration for one analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Disabled tools are not invoked at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Executable to run (defaults to the tool name on PATH)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,

    /// Replaces the built-in argument list when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

fn default_enabled() -> bool {
    true
}

impl ToolConfig {
    /// Explicit entry for a built-in tool, used when writing a fresh config
    pub(crate) fn builtin(name: &str) -> Self {
        Self {
            enabled: true,
            binary: Some(name.to_string()),
            args: None,
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            binary: None,
            args: None,
        }
    }
}
