// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Platform Abstraction
//!
//! Thin, synchronous wrapper over OS-specific facts the core needs at
//! startup: CPU count (for sizing worker pools), available memory (for
//! the quota manager's headroom checks), and file durability (`fsync`
//! after a chunk write completes).

use std::fs::File;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
type PlatformImpl = unix::UnixPlatform;
#[cfg(windows)]
type PlatformImpl = windows::WindowsPlatform;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not supported on this platform: {0}")]
    NotSupported(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("{0}")]
    Other(String),
}

/// OS facts and file-durability primitives the bootstrap layer exposes
/// to the core, so the core stays free of `#[cfg(unix)]`/`#[cfg(windows)]`
/// branches.
pub trait Platform: Send + Sync {
    fn page_size(&self) -> usize;
    fn cpu_count(&self) -> usize;
    fn total_memory(&self) -> Result<u64, PlatformError>;
    fn available_memory(&self) -> Result<u64, PlatformError>;
    fn line_separator(&self) -> &'static str;
    fn path_separator(&self) -> char;
    fn platform_name(&self) -> &'static str;
    fn temp_dir(&self) -> PathBuf;
    fn is_elevated(&self) -> bool;
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<(), PlatformError>;
    fn is_executable(&self, path: &Path) -> bool;

    /// Flushes `file`'s contents and metadata to stable storage. Called
    /// after the last chunk of a download is written, and after the
    /// resume journal is updated (§4.F, §4.G).
    fn sync_file(&self, file: &File) -> Result<(), PlatformError>;
}

pub fn create_platform() -> Box<dyn Platform> {
    Box::new(PlatformImpl::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_reports_sane_basics() {
        let platform = create_platform();
        assert!(platform.cpu_count() >= 1);
        assert!(platform.page_size() >= 512);
        assert!(!platform.temp_dir().as_os_str().is_empty());
    }
}
