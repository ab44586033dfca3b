// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File Metadata Value Object

use serde::{Deserialize, Serialize};

/// Descriptive metadata for a file being transferred: name, size, chunk
/// layout, and whole-file integrity hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub filename: String,
    pub file_size: u64,
    pub total_chunks: u64,
    pub chunk_size: u32,
    /// Lowercase hex-encoded SHA-256 of the original file bytes.
    pub sha256_hash: String,
}

impl FileMetadata {
    /// Builds metadata for a file, computing `total_chunks` as
    /// `ceil(file_size / chunk_size)` (§3 invariant). A zero-byte file still
    /// yields exactly one chunk, matching the single-chunk boundary case in
    /// §8.
    pub fn new(filename: String, file_size: u64, chunk_size: u32, sha256_hash: String) -> Self {
        let total_chunks = if file_size == 0 {
            1
        } else {
            file_size.div_ceil(chunk_size as u64)
        };
        Self {
            filename,
            file_size,
            total_chunks,
            chunk_size,
            sha256_hash,
        }
    }

    /// Byte length of the given 0-based chunk index; the last chunk may be
    /// shorter than `chunk_size`.
    pub fn chunk_len(&self, chunk_index: u64) -> u64 {
        if self.file_size == 0 {
            return 0;
        }
        let offset = chunk_index * self.chunk_size as u64;
        let remaining = self.file_size.saturating_sub(offset);
        remaining.min(self.chunk_size as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_chunks_matches_round_trip_scenario() {
        // 2.5 MiB at the default 256 KiB chunk size -> 10 chunks.
        let size = 2 * 1024 * 1024 + 512 * 1024;
        let meta = FileMetadata::new("f.bin".into(), size, 256 * 1024, "abc".into());
        assert_eq!(meta.total_chunks, 10);
        assert_eq!(meta.chunk_len(9), size - 9 * 256 * 1024);
        assert_eq!(meta.chunk_len(9), 202_752);
    }

    #[test]
    fn empty_file_has_one_chunk_of_zero_length() {
        let meta = FileMetadata::new("empty".into(), 0, 256 * 1024, "e3b0c4".into());
        assert_eq!(meta.total_chunks, 1);
        assert_eq!(meta.chunk_len(0), 0);
    }
}
