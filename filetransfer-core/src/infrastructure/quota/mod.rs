// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Quota Manager (§4.E)
//!
//! Tracks storage-directory usage against an administrative cap, firing
//! monotonic-one-shot warnings as usage crosses configured thresholds and
//! optionally running a cleanup policy to reclaim space.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::SystemTime;

use filetransfer_domain::value_objects::QuotaUsage;
use filetransfer_domain::TransferError;

/// Default monotonic-one-shot warning thresholds, in whole percent (§4.E).
pub const DEFAULT_WARNING_THRESHOLDS: &[u8] = &[80, 90, 95];

#[derive(Debug, Clone)]
pub struct CleanupPolicy {
    pub enabled: bool,
    pub trigger_threshold_percent: f64,
    pub target_threshold_percent: f64,
    pub delete_oldest_first: bool,
    pub exclusions: Vec<String>,
    pub min_file_age: std::time::Duration,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            trigger_threshold_percent: 95.0,
            target_threshold_percent: 80.0,
            delete_oldest_first: true,
            exclusions: Vec::new(),
            min_file_age: std::time::Duration::from_secs(3600),
        }
    }
}

pub struct QuotaManager {
    storage_path: PathBuf,
    total_quota: u64,
    used_bytes: AtomicU64,
    file_count: AtomicU64,
    triggered_thresholds: Mutex<Vec<u8>>,
    warning_thresholds: Vec<u8>,
    cleanup_policy: CleanupPolicy,
}

impl QuotaManager {
    pub fn new(storage_path: impl Into<PathBuf>, total_quota: u64) -> Self {
        Self {
            storage_path: storage_path.into(),
            total_quota,
            used_bytes: AtomicU64::new(0),
            file_count: AtomicU64::new(0),
            triggered_thresholds: Mutex::new(Vec::new()),
            warning_thresholds: DEFAULT_WARNING_THRESHOLDS.to_vec(),
            cleanup_policy: CleanupPolicy::default(),
        }
    }

    pub fn with_cleanup_policy(mut self, policy: CleanupPolicy) -> Self {
        self.cleanup_policy = policy;
        self
    }

    pub fn usage(&self) -> QuotaUsage {
        QuotaUsage::new(self.total_quota, self.used_bytes.load(Ordering::Relaxed), self.file_count.load(Ordering::Relaxed))
    }

    /// `total_quota == 0` means unlimited (§3); any request is admitted.
    pub fn check_quota(&self, need: u64) -> Result<(), TransferError> {
        if self.total_quota == 0 {
            return Ok(());
        }
        let used = self.used_bytes.load(Ordering::Relaxed);
        if used.saturating_add(need) > self.total_quota {
            return Err(TransferError::StorageQuotaExceeded);
        }
        Ok(())
    }

    pub fn check_file_size(&self, n: u64, max_file_size: u64) -> Result<(), TransferError> {
        if max_file_size > 0 && n > max_file_size {
            return Err(TransferError::MaxFileSizeExceeded);
        }
        Ok(())
    }

    pub fn record_bytes_added(&self, n: u64) {
        self.used_bytes.fetch_add(n, Ordering::Relaxed);
        self.check_thresholds();
    }

    pub fn record_bytes_removed(&self, n: u64) {
        self.used_bytes.fetch_sub(n.min(self.used_bytes.load(Ordering::Relaxed)), Ordering::Relaxed);
    }

    pub fn record_file_added(&self) {
        self.file_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_removed(&self) {
        self.file_count.fetch_sub(1.min(self.file_count.load(Ordering::Relaxed)), Ordering::Relaxed);
    }

    /// Rescans `storage_path`, summing regular-file sizes (§4.E, §8
    /// `refresh_usage` invariant). Not incremental — a full directory walk.
    pub fn refresh_usage(&self) -> Result<(), TransferError> {
        let (bytes, count) = Self::scan_dir(&self.storage_path)?;
        self.used_bytes.store(bytes, Ordering::Relaxed);
        self.file_count.store(count, Ordering::Relaxed);
        self.check_thresholds();
        Ok(())
    }

    fn scan_dir(dir: &Path) -> Result<(u64, u64), TransferError> {
        let mut bytes = 0u64;
        let mut count = 0u64;
        if !dir.exists() {
            return Ok((0, 0));
        }
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                bytes += metadata.len();
                count += 1;
            } else if metadata.is_dir() {
                let (sub_bytes, sub_count) = Self::scan_dir(&entry.path())?;
                bytes += sub_bytes;
                count += sub_count;
            }
        }
        Ok((bytes, count))
    }

    /// Fires each threshold in `warning_thresholds` exactly once as usage
    /// rises past it, until [`Self::reset_threshold_triggers`] is called.
    fn check_thresholds(&self) {
        let percent = self.usage().usage_percent();
        let mut triggered = self.triggered_thresholds.lock().unwrap();
        for &threshold in &self.warning_thresholds {
            if percent >= threshold as f64 && !triggered.contains(&threshold) {
                triggered.push(threshold);
                // Caller-visible effect is surfaced via the Logger/Monitor
                // ports at the call site that owns this manager.
            }
        }
    }

    pub fn reset_threshold_triggers(&self) {
        self.triggered_thresholds.lock().unwrap().clear();
    }

    pub fn triggered_thresholds(&self) -> Vec<u8> {
        self.triggered_thresholds.lock().unwrap().clone()
    }

    pub fn is_quota_exceeded(&self) -> bool {
        self.usage().is_exceeded()
    }

    /// Deletes files oldest-first (or newest-first, per policy) until
    /// usage falls to `target_threshold_percent`, skipping excluded and
    /// too-young files. Returns bytes freed. No-op unless the policy is
    /// enabled and the trigger threshold has been crossed.
    pub fn execute_cleanup(&self) -> Result<u64, TransferError> {
        if !self.cleanup_policy.enabled || self.usage().usage_percent() < self.cleanup_policy.trigger_threshold_percent {
            return Ok(0);
        }

        let mut candidates: Vec<(PathBuf, SystemTime, u64)> = Vec::new();
        Self::collect_candidates(&self.storage_path, &mut candidates)?;

        candidates.retain(|(path, modified, _)| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if self.cleanup_policy.exclusions.iter().any(|excl| name.contains(excl.as_str())) {
                return false;
            }
            modified.elapsed().map(|age| age >= self.cleanup_policy.min_file_age).unwrap_or(false)
        });

        candidates.sort_by_key(|(_, modified, _)| *modified);
        if !self.cleanup_policy.delete_oldest_first {
            candidates.reverse();
        }

        let mut freed = 0u64;
        for (path, _, size) in candidates {
            if self.usage().usage_percent() <= self.cleanup_policy.target_threshold_percent {
                break;
            }
            if fs::remove_file(&path).is_ok() {
                self.record_bytes_removed(size);
                self.record_file_removed();
                freed += size;
            }
        }
        Ok(freed)
    }

    fn collect_candidates(dir: &Path, out: &mut Vec<(PathBuf, SystemTime, u64)>) -> Result<(), TransferError> {
        if !dir.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                out.push((entry.path(), metadata.modified()?, metadata.len()));
            } else if metadata.is_dir() {
                Self::collect_candidates(&entry.path(), out)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn zero_quota_is_unlimited() {
        let dir = tempdir().unwrap();
        let manager = QuotaManager::new(dir.path(), 0);
        assert!(manager.check_quota(u64::MAX / 2).is_ok());
    }

    #[test]
    fn exceeding_quota_is_rejected() {
        let dir = tempdir().unwrap();
        let manager = QuotaManager::new(dir.path(), 1000);
        manager.record_bytes_added(900);
        assert!(manager.check_quota(50).is_ok());
        assert!(manager.check_quota(200).is_err());
    }

    #[test]
    fn thresholds_fire_once_per_crossing() {
        let dir = tempdir().unwrap();
        let manager = QuotaManager::new(dir.path(), 1000);
        manager.record_bytes_added(850);
        assert_eq!(manager.triggered_thresholds(), vec![80u8]);
        manager.record_bytes_added(1);
        assert_eq!(manager.triggered_thresholds(), vec![80u8]);
        manager.reset_threshold_triggers();
        assert!(manager.triggered_thresholds().is_empty());
    }

    #[test]
    fn refresh_usage_matches_directory_contents() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.bin"), vec![0u8; 100]).unwrap();
        fs::write(dir.path().join("b.bin"), vec![0u8; 250]).unwrap();
        let manager = QuotaManager::new(dir.path(), 0);
        manager.refresh_usage().unwrap();
        assert_eq!(manager.usage().used_bytes, 350);
        assert_eq!(manager.usage().file_count, 2);
    }
}
