//! On-disk result documents, one `<scan_id>.json` per completed scan

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::ScanReport;

#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, scan_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", scan_id))
    }

    /// Write the report atomically (temp file + rename)
    pub fn write(&self, report: &ScanReport) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create results directory: {}", self.dir.display())
        })?;

        let content =
            serde_json::to_vec_pretty(report).with_context(|| "Failed to serialize scan report")?;

        let path = self.path_for(&report.scan_id);
        let temp_path = path.with_extension("json.tmp");
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        temp_file
            .write_all(&content)
            .with_context(|| "Failed to write scan report")?;
        temp_file
            .sync_all()
            .with_context(|| "Failed to sync scan report")?;

        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to rename result file: {}", path.display()))?;

        Ok(path)
    }

    /// Read a stored report, `None` if the scan has no result file
    pub fn read(&self, scan_id: &str) -> Result<Option<ScanReport>> {
        let path = self.path_for(scan_id);
        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read result file: {}", path.display()));
            }
        };

        let report = serde_json::from_slice(&content)
            .with_context(|| format!("Failed to parse result file: {}", path.display()))?;
        Ok(Some(report))
    }
}
