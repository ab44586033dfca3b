// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Unix Platform Implementation
//!
//! Backed by `libc` for CPU/page/permission queries and `/proc/meminfo`
//! for memory sizing (no reliable libc call for available memory on
//! Linux; `sysinfo(2)`'s `freeram` over-reports once the page cache is
//! counted).

use std::fs::File;
use std::io::Read as _;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use super::{Platform, PlatformError};

pub struct UnixPlatform;

impl UnixPlatform {
    pub fn new() -> Self {
        Self
    }

    fn meminfo_kib(field: &str) -> Result<u64, PlatformError> {
        let mut contents = String::new();
        File::open("/proc/meminfo")?.read_to_string(&mut contents)?;
        contents
            .lines()
            .find(|line| line.starts_with(field))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|kib| kib.parse::<u64>().ok())
            .map(|kib| kib * 1024)
            .ok_or_else(|| PlatformError::Other(format!("{field} not found in /proc/meminfo")))
    }
}

impl Default for UnixPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for UnixPlatform {
    fn page_size(&self) -> usize {
        // SAFETY: sysconf with a valid name constant never touches memory we own.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            size as usize
        } else {
            4096
        }
    }

    fn cpu_count(&self) -> usize {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    }

    fn total_memory(&self) -> Result<u64, PlatformError> {
        Self::meminfo_kib("MemTotal:")
    }

    fn available_memory(&self) -> Result<u64, PlatformError> {
        Self::meminfo_kib("MemAvailable:")
    }

    fn line_separator(&self) -> &'static str {
        "\n"
    }

    fn path_separator(&self) -> char {
        ':'
    }

    fn platform_name(&self) -> &'static str {
        if cfg!(target_os = "macos") {
            "macos"
        } else {
            "linux"
        }
    }

    fn temp_dir(&self) -> PathBuf {
        std::env::temp_dir()
    }

    fn is_elevated(&self) -> bool {
        // SAFETY: getuid takes no arguments and cannot fail.
        unsafe { libc::getuid() == 0 }
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<(), PlatformError> {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|e| e.into())
    }

    fn is_executable(&self, path: &Path) -> bool {
        std::fs::metadata(path).map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
    }

    fn sync_file(&self, file: &File) -> Result<(), PlatformError> {
        file.sync_all().map_err(|e| e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basics_are_sane() {
        let platform = UnixPlatform::new();
        assert!(platform.cpu_count() >= 1);
        assert_eq!(platform.line_separator(), "\n");
        assert_eq!(platform.path_separator(), ':');
    }

    #[test]
    fn non_root_is_not_elevated_in_ci() {
        // Best-effort: CI runners are typically non-root, but this isn't
        // guaranteed, so only assert the call doesn't panic.
        let platform = UnixPlatform::new();
        let _ = platform.is_elevated();
    }
}
