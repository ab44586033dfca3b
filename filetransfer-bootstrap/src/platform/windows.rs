// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Windows Platform Implementation
//!
//! Uses `winapi` when actually compiled for Windows, and falls back to
//! conservative stubs when cross-compiling from Unix so the workspace
//! still builds everywhere.

use std::fs::File;
use std::path::{Path, PathBuf};

use super::{Platform, PlatformError};

pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        Self
    }

    #[cfg(windows)]
    fn memory_info() -> Result<(u64, u64), PlatformError> {
        use std::mem;
        use winapi::um::sysinfoapi::{GlobalMemoryStatusEx, MEMORYSTATUSEX};

        unsafe {
            let mut status: MEMORYSTATUSEX = mem::zeroed();
            status.dwLength = mem::size_of::<MEMORYSTATUSEX>() as u32;
            if GlobalMemoryStatusEx(&mut status) != 0 {
                Ok((status.ullTotalPhys, status.ullAvailPhys))
            } else {
                Err(PlatformError::Other("GlobalMemoryStatusEx failed".to_string()))
            }
        }
    }

    #[cfg(not(windows))]
    fn memory_info() -> Result<(u64, u64), PlatformError> {
        Err(PlatformError::NotSupported("Windows memory APIs unavailable on this platform".to_string()))
    }

    #[cfg(windows)]
    fn page_size() -> usize {
        use std::mem;
        use winapi::um::sysinfoapi::{GetSystemInfo, SYSTEM_INFO};
        unsafe {
            let mut info: SYSTEM_INFO = mem::zeroed();
            GetSystemInfo(&mut info);
            info.dwPageSize as usize
        }
    }

    #[cfg(not(windows))]
    fn page_size() -> usize {
        4096
    }

    #[cfg(windows)]
    fn cpu_count() -> usize {
        use std::mem;
        use winapi::um::sysinfoapi::{GetSystemInfo, SYSTEM_INFO};
        unsafe {
            let mut info: SYSTEM_INFO = mem::zeroed();
            GetSystemInfo(&mut info);
            info.dwNumberOfProcessors as usize
        }
    }

    #[cfg(not(windows))]
    fn cpu_count() -> usize {
        1
    }

    #[cfg(windows)]
    fn is_elevated() -> bool {
        #[link(name = "shell32")]
        extern "system" {
            fn IsUserAnAdmin() -> i32;
        }
        unsafe { IsUserAnAdmin() != 0 }
    }

    #[cfg(not(windows))]
    fn is_elevated() -> bool {
        false
    }
}

impl Default for WindowsPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for WindowsPlatform {
    fn page_size(&self) -> usize {
        Self::page_size()
    }

    fn cpu_count(&self) -> usize {
        Self::cpu_count()
    }

    fn total_memory(&self) -> Result<u64, PlatformError> {
        Self::memory_info().map(|(total, _)| total)
    }

    fn available_memory(&self) -> Result<u64, PlatformError> {
        Self::memory_info().map(|(_, available)| available)
    }

    fn line_separator(&self) -> &'static str {
        "\r\n"
    }

    fn path_separator(&self) -> char {
        ';'
    }

    fn platform_name(&self) -> &'static str {
        "windows"
    }

    fn temp_dir(&self) -> PathBuf {
        std::env::temp_dir()
    }

    fn is_elevated(&self) -> bool {
        Self::is_elevated()
    }

    fn set_permissions(&self, _path: &Path, _mode: u32) -> Result<(), PlatformError> {
        Ok(())
    }

    fn is_executable(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| matches!(ext.to_string_lossy().to_lowercase().as_str(), "exe" | "bat" | "cmd" | "com" | "ps1" | "msi"))
            .unwrap_or(false)
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
        let platform = WindowsPlatform::new();
        assert!(platform.cpu_count() >= 1);
        assert_eq!(platform.line_separator(), "\r\n");
        assert_eq!(platform.path_separator(), ';');
    }

    #[test]
    fn executable_extensions() {
        let platform = WindowsPlatform::new();
        assert!(platform.is_executable(Path::new("program.exe")));
        assert!(!platform.is_executable(Path::new("document.txt")));
    }
}
