// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Compression Service
//!
//! Adaptive LZ4 compression for chunk payloads (§4, §7). The domain only
//! names the algorithm; the infrastructure layer picks the LZ4 crate and
//! owns the compressibility heuristics.
//!
//! NOTE: Domain traits are synchronous. Async execution, if any, is an
//! infrastructure concern.

use crate::errors::TransferError;

/// Minimum compression ratio (`compressed_len / original_len`) below which
/// a chunk is considered worth sending compressed (§7).
pub const COMPRESSIBILITY_THRESHOLD: f64 = 0.9;

/// Domain service interface for adaptive chunk compression.
pub trait CompressionService: Send + Sync {
    /// Compresses `data`, returning the compressed bytes.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, TransferError>;

    /// Decompresses `data` back to `original_len` bytes.
    fn decompress(&self, data: &[u8], original_len: usize) -> Result<Vec<u8>, TransferError>;

    /// Cheap probe for whether `data` is likely to benefit from
    /// compression, without performing a full compress pass. Used by the
    /// pipeline to skip compression of already-compressed payloads
    /// (magic-byte sniffing per §7).
    fn is_compressible(&self, data: &[u8]) -> bool;

    /// Decides whether compressing `data` is worthwhile by actually
    /// compressing a sample and comparing against
    /// [`COMPRESSIBILITY_THRESHOLD`].
    fn should_compress(&self, data: &[u8]) -> Result<bool, TransferError> {
        if !self.is_compressible(data) {
            return Ok(false);
        }
        let compressed = self.compress(data)?;
        let ratio = compressed.len() as f64 / data.len().max(1) as f64;
        Ok(ratio < COMPRESSIBILITY_THRESHOLD)
    }
}
