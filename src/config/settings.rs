//! Settings configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::Config;

/// General settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Root directory under which each scan clones into `<clone_dir>/<scan_id>`
    #[serde(default = "default_clone_dir")]
    pub clone_dir: PathBuf,

    /// Directory receiving one `<scan_id>.json` result document per completed scan
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// SQLite database holding scan records
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Repositories larger than this after cloning are rejected (0 disables the check)
    #[serde(default = "default_max_repo_size_mb")]
    pub max_repo_size_mb: u64,

    /// Upper bound for the clone and for each analyzer run of a scan
    #[serde(default = "default_scan_timeout_seconds")]
    pub scan_timeout_seconds: u64,

    /// HTTP API settings
    #[serde(default)]
    pub http: HttpSettings,
}

/// HTTP API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Address to bind (default: loopback only)
    #[serde(default = "default_http_bind")]
    pub bind: String,

    #[serde(default = "default_http_port")]
    pub port: u16,

    /// Optional shared secret, sent as `X-Reposcan-Token`. Empty disables auth.
    #[serde(default)]
    pub token: String,
}

fn default_clone_dir() -> PathBuf {
    Config::global_config_dir().join("temp_repos")
}

fn default_results_dir() -> PathBuf {
    Config::global_config_dir().join("scan_results")
}

fn default_database_path() -> PathBuf {
    Config::global_config_dir().join("scans.db")
}

fn default_max_repo_size_mb() -> u64 {
    100
}

fn default_scan_timeout_seconds() -> u64 {
    300
}

fn default_http_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8000
}

impl Settings {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_seconds.max(1))
    }

    /// Size ceiling in bytes, `None` when disabled
    pub fn max_repo_size_bytes(&self) -> Option<u64> {
        (self.max_repo_size_mb > 0).then(|| self.max_repo_size_mb.saturating_mul(1024 * 1024))
    }

    /// Expand a leading `~` in every configured path
    pub(super) fn expand_paths(&mut self) {
        self.clone_dir = expand_home(&self.clone_dir);
        self.results_dir = expand_home(&self.results_dir);
        self.database_path = expand_home(&self.database_path);
    }
}

impl HttpSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// The token when auth is enabled
    pub fn auth_token(&self) -> Option<&str> {
        Some(self.token.as_str()).filter(|t| !t.trim().is_empty())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            clone_dir: default_clone_dir(),
            results_dir: default_results_dir(),
            database_path: default_database_path(),
            max_repo_size_mb: default_max_repo_size_mb(),
            scan_timeout_seconds: default_scan_timeout_seconds(),
            http: HttpSettings::default(),
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            bind: default_http_bind(),
            port: default_http_port(),
            token: String::new(),
        }
    }
}

fn expand_home(path: &std::path::Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_ceiling_in_bytes() {
        let mut settings = Settings::default();
        settings.max_repo_size_mb = 2;
        assert_eq!(settings.max_repo_size_bytes(), Some(2 * 1024 * 1024));

        settings.max_repo_size_mb = 0;
        assert_eq!(settings.max_repo_size_bytes(), None);

        settings.max_repo_size_mb = u64::MAX;
        assert_eq!(settings.max_repo_size_bytes(), Some(u64::MAX));
    }
}
