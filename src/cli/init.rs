//! Init command implementation

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use reposcan::config::Config;

/// Default configuration content for reposcan init
pub const DEFAULT_CONFIG: &str = r#"# reposcan configuration
# =====================
#
# Paths may start with `~`. A missing key falls back to its default.

[settings]
# Each scan clones into <clone_dir>/<scan_id>; the clone is removed afterwards
clone_dir = "~/.reposcan/temp_repos"
# One <scan_id>.json report per completed scan
results_dir = "~/.reposcan/scan_results"
database_path = "~/.reposcan/scans.db"
# Reject repositories larger than this after cloning (0 disables the check)
max_repo_size_mb = 100
# Upper bound for the clone and for each analyzer
scan_timeout_seconds = 300

# HTTP API used by `reposcan serve`, `submit`, `status` and `list`
[settings.http]
bind = "127.0.0.1"
port = 8000
# Optional: shared secret (sent as `X-Reposcan-Token`). Empty disables auth.
token = ""

# ============================================================================
# TOOLS - external analyzers, run concurrently in every scan
# ============================================================================
#
#   enabled - set to false to skip the tool
#   binary  - executable name or path
#   args    - replaces the built-in arguments; the tool runs from the
#             repository root and must print its JSON report on stdout

[tools.bandit]
enabled = true
binary = "bandit"
# args = ["-r", "-f", "json", "-q", "."]

[tools.semgrep]
enabled = true
binary = "semgrep"
# args = ["--config=auto", "--json", "--quiet", "."]
"#;

/// Write the default configuration file
pub fn init_command(
    work_dir: &Path,
    config_path: Option<PathBuf>,
    local: bool,
    force: bool,
) -> Result<PathBuf> {
    let config_path = match config_path {
        Some(path) if path.is_absolute() => path,
        Some(path) => work_dir.join(path),
        None if local => Config::local_config_path(work_dir),
        None => Config::global_config_path(),
    };

    if config_path.exists() && !force {
        bail!(
            "Configuration already exists: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Created: {}", config_path.display());

    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses_with_builtin_tools() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.settings.max_repo_size_mb, 100);
        assert_eq!(config.settings.http.port, 8000);
        assert!(config.tool("bandit").enabled);
        assert!(config.tool("semgrep").enabled);
        assert_eq!(config.tool("semgrep").args, None);
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = init_command(dir.path(), None, true, false).unwrap();
        assert_eq!(path, Config::local_config_path(dir.path()));

        assert!(init_command(dir.path(), None, true, false).is_err());
        assert!(init_command(dir.path(), None, true, true).is_ok());
    }
}
