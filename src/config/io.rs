//! Configuration file I/O operations

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use super::Config;

/// Project-local config location, relative to the working directory
const LOCAL_CONFIG_PATH: &str = ".reposcan/config.toml";

impl Config {
    /// Get the global config directory path (~/.reposcan/)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".reposcan")
    }

    /// Get the global config file path (~/.reposcan/config.toml)
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    /// Get the project-local config path (`<work_dir>/.reposcan/config.toml`)
    pub fn local_config_path(work_dir: &Path) -> PathBuf {
        work_dir.join(LOCAL_CONFIG_PATH)
    }

    /// Find the config file to use.
    ///
    /// Lookup order: explicit override, `.reposcan/config.toml` in `work_dir`,
    /// then the global config. Returns `None` when nothing exists on disk.
    pub fn locate(work_dir: &Path, config_override: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = config_override {
            return Some(if path.is_absolute() {
                path.to_path_buf()
            } else {
                work_dir.join(path)
            });
        }

        let local = Self::local_config_path(work_dir);
        if local.exists() {
            return Some(local);
        }

        let global = Self::global_config_path();
        global.exists().then_some(global)
    }

    /// Load the effective configuration.
    ///
    /// An explicit override must exist; otherwise a missing file means defaults.
    pub fn load(work_dir: &Path, config_override: Option<&Path>) -> Result<Self> {
        match Self::locate(work_dir, config_override) {
            Some(path) => {
                tracing::debug!("[reposcan:config] Loading {}", path.display());
                Self::from_file(&path)
            }
            None => {
                tracing::debug!("[reposcan:config] No config file found, using defaults");
                Ok(Self::with_defaults())
            }
        }
    }

    /// Save configuration to a file with atomic write and file locking.
    ///
    /// This ensures:
    /// 1. Exclusive lock prevents concurrent writers
    /// 2. Atomic write (temp file + rename) prevents corruption on crash
    /// 3. Parent directory is created if needed
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        // Lock file is separate from the config so the rename below cannot drop it
        let lock_path = path.with_extension("toml.lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

        lock_file
            .lock_exclusive()
            .with_context(|| "Failed to acquire config lock")?;

        let temp_path = path.with_extension("toml.tmp");
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        temp_file
            .write_all(content.as_bytes())
            .with_context(|| "Failed to write config content")?;

        temp_file
            .sync_all()
            .with_context(|| "Failed to sync config file")?;

        std::fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename config file: {}", path.display()))?;

        // Lock is released when lock_file is dropped
        Ok(())
    }
}
