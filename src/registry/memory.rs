use std::collections::HashMap;
use std::sync::Mutex;

use super::{RegistryError, ScanRegistry};
use crate::{ScanId, ScanJob, ScanStatus, ScanUpdate};

/// In-process registry, lost on exit
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    scans: Mutex<HashMap<ScanId, ScanJob>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn scans(&self) -> Result<std::sync::MutexGuard<'_, HashMap<ScanId, ScanJob>>, RegistryError> {
        self.scans.lock().map_err(|_| RegistryError::Poisoned)
    }
}

impl ScanRegistry for MemoryRegistry {
    fn create(&self, job: &ScanJob) -> Result<(), RegistryError> {
        let mut scans = self.scans()?;
        if scans.contains_key(&job.scan_id) {
            return Err(RegistryError::AlreadyExists(job.scan_id.clone()));
        }
        scans.insert(job.scan_id.clone(), job.clone());
        Ok(())
    }

    fn get(&self, scan_id: &str) -> Result<ScanJob, RegistryError> {
        self.scans()?
            .get(scan_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(scan_id.to_string()))
    }

    fn update(
        &self,
        scan_id: &str,
        expected: ScanStatus,
        update: ScanUpdate,
    ) -> Result<ScanJob, RegistryError> {
        let mut scans = self.scans()?;
        let job = scans
            .get_mut(scan_id)
            .ok_or_else(|| RegistryError::NotFound(scan_id.to_string()))?;

        if job.status != expected {
            return Err(RegistryError::Conflict {
                scan_id: scan_id.to_string(),
                expected,
                actual: job.status,
            });
        }

        job.apply(update)?;
        Ok(job.clone())
    }

    fn list(
        &self,
        status: Option<ScanStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<ScanJob>, RegistryError> {
        let scans = self.scans()?;
        let mut jobs: Vec<ScanJob> = scans
            .values()
            .filter(|job| status.is_none_or(|s| job.status == s))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.scan_id.cmp(&b.scan_id))
        });
        if let Some(limit) = limit {
            jobs.truncate(limit);
        }
        Ok(jobs)
    }
}
