// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Adaptive LZ4 Compression Adapter
//!
//! Implements [`CompressionService`] with `lz4_flex`'s block format (no
//! frame header — `original_size` already travels in the chunk header, so
//! there's nothing to gain from LZ4's own frame container).

use filetransfer_domain::services::CompressionService;
use filetransfer_domain::TransferError;

/// First bytes of container formats that are already compressed, so
/// re-compressing them would waste a pass (§4.B adaptive probe).
const PRECOMPRESSED_MAGIC: &[&[u8]] = &[
    &[0x50, 0x4B, 0x03, 0x04], // zip
    &[0x1F, 0x8B],             // gzip
    &[0xFF, 0xD8, 0xFF],       // jpeg
    &[0x89, b'P', b'N', b'G'], // png
    &[b'R', b'I', b'F', b'F'], // webp (RIFF container)
    &[0x00, 0x00, 0x00, 0x18, b'f', b't', b'y', b'p'], // mp4
    &[b'7', b'z', 0xBC, 0xAF, 0x27, 0x1C], // 7z
    &[0xFD, b'7', b'z', b'X', b'Z', 0x00], // xz
    &[0x28, 0xB5, 0x2F, 0xFD], // zstd
];

const PROBE_SAMPLE_SIZE: usize = 4 * 1024;

#[derive(Debug, Default)]
pub struct AdaptiveLz4Compression;

impl AdaptiveLz4Compression {
    pub fn new() -> Self {
        Self
    }

    /// Worst-case LZ4 block output size for an input of `n` bytes (§4.B).
    fn max_compressed_size(n: usize) -> usize {
        n + n / 255 + 16
    }
}

impl CompressionService for AdaptiveLz4Compression {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, TransferError> {
        let compressed = lz4_flex::block::compress(data);
        if compressed.len() > Self::max_compressed_size(data.len()) {
            return Err(TransferError::CompressionBufferError);
        }
        Ok(compressed)
    }

    fn decompress(&self, data: &[u8], original_len: usize) -> Result<Vec<u8>, TransferError> {
        lz4_flex::block::decompress(data, original_len)
            .map_err(|e| TransferError::DecompressionFailed(e.to_string()))
    }

    fn is_compressible(&self, data: &[u8]) -> bool {
        let sample = &data[..data.len().min(PROBE_SAMPLE_SIZE)];
        if PRECOMPRESSED_MAGIC.iter().any(|magic| sample.starts_with(magic)) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let compression = AdaptiveLz4Compression::new();
        let data = b"the quick brown fox jumps over the lazy dog".repeat(50);
        let compressed = compression.compress(&data).unwrap();
        let decompressed = compression.decompress(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn round_trips_empty_input() {
        let compression = AdaptiveLz4Compression::new();
        let compressed = compression.compress(&[]).unwrap();
        let decompressed = compression.decompress(&compressed, 0).unwrap();
        assert!(decompressed.is_empty());
    }

    #[test]
    fn recognizes_gzip_magic_as_incompressible() {
        let compression = AdaptiveLz4Compression::new();
        let mut sample = vec![0x1F, 0x8B, 0x08, 0x00];
        sample.extend(std::iter::repeat(0u8).take(100));
        assert!(!compression.is_compressible(&sample));
    }

    #[test]
    fn plain_text_is_compressible() {
        let compression = AdaptiveLz4Compression::new();
        assert!(compression.is_compressible(b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"));
    }

    #[test]
    fn should_compress_skips_low_ratio_data() {
        use filetransfer_domain::services::COMPRESSIBILITY_THRESHOLD;
        let compression = AdaptiveLz4Compression::new();
        let highly_repetitive = vec![b'a'; 8192];
        let ratio = compression.compress(&highly_repetitive).unwrap().len() as f64 / highly_repetitive.len() as f64;
        assert!(ratio < COMPRESSIBILITY_THRESHOLD);
        assert!(compression.should_compress(&highly_repetitive).unwrap());
    }
}
