// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk Header Value Object
//!
//! The 48-byte, little-endian, packed wire header that precedes every
//! chunk's payload. Layout (see module-level ASCII table in spec §3):
//!
//! ```text
//! offset size field
//! 0      16   transfer_id
//! 16     8    chunk_index
//! 24     8    chunk_offset
//! 32     4    original_size
//! 36     4    compressed_size
//! 40     4    checksum
//! 44     1    flags
//! 45     3    reserved (zero)
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::TransferError;
use crate::value_objects::transfer_id::TransferId;

/// Wire size of an encoded chunk header, in bytes.
pub const CHUNK_HEADER_SIZE: usize = 48;

/// Flag bit layout for [`ChunkHeader::flags`].
pub mod flags {
    pub const FIRST: u8 = 0x01;
    pub const LAST: u8 = 0x02;
    pub const COMPRESSED: u8 = 0x04;
    pub const ENCRYPTED: u8 = 0x08;
    /// Bits 4-7 must be zero; anything else is a malformed header.
    pub const RESERVED_MASK: u8 = 0xF0;
}

/// The fixed 48-byte header preceding a chunk's payload on the wire.
///
/// Also serde-serializable: the chunked transfer protocol (§4.G) embeds a
/// header in its `ChunkData` message as JSON rather than the raw 48-byte
/// form, matching that protocol's debuggability-over-density wire choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkHeader {
    pub transfer_id: TransferId,
    pub chunk_index: u64,
    pub chunk_offset: u64,
    pub original_size: u32,
    pub compressed_size: u32,
    pub checksum: u32,
    pub flags: u8,
}

impl ChunkHeader {
    pub fn is_first(&self) -> bool {
        self.flags & flags::FIRST != 0
    }

    pub fn is_last(&self) -> bool {
        self.flags & flags::LAST != 0
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & flags::COMPRESSED != 0
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & flags::ENCRYPTED != 0
    }

    /// Validates the invariants from spec §3:
    /// `compressed_size <= 2*original_size + 64`, and when the `compressed`
    /// flag is clear, `compressed_size == original_size`.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.flags & flags::RESERVED_MASK != 0 {
            return Err(TransferError::ChunkSizeError);
        }
        if self.compressed_size as u64 > 2 * self.original_size as u64 + 64 {
            return Err(TransferError::ChunkSizeError);
        }
        if !self.is_compressed() && self.compressed_size != self.original_size {
            return Err(TransferError::ChunkSizeError);
        }
        Ok(())
    }

    /// Encodes this header into its canonical 48-byte little-endian form.
    pub fn encode(&self) -> [u8; CHUNK_HEADER_SIZE] {
        let mut buf = [0u8; CHUNK_HEADER_SIZE];
        buf[0..16].copy_from_slice(self.transfer_id.as_bytes());
        buf[16..24].copy_from_slice(&self.chunk_index.to_le_bytes());
        buf[24..32].copy_from_slice(&self.chunk_offset.to_le_bytes());
        buf[32..36].copy_from_slice(&self.original_size.to_le_bytes());
        buf[36..40].copy_from_slice(&self.compressed_size.to_le_bytes());
        buf[40..44].copy_from_slice(&self.checksum.to_le_bytes());
        buf[44] = self.flags;
        // buf[45..48] stays zero (reserved).
        buf
    }

    /// Decodes a 48-byte buffer into a header, rejecting non-zero reserved
    /// bytes and invariant violations with [`TransferError::ChunkSizeError`].
    pub fn decode(bytes: &[u8]) -> Result<Self, TransferError> {
        if bytes.len() != CHUNK_HEADER_SIZE {
            return Err(TransferError::ChunkSizeError);
        }
        if bytes[45..48] != [0, 0, 0] {
            return Err(TransferError::ChunkSizeError);
        }

        let mut id_bytes = [0u8; 16];
        id_bytes.copy_from_slice(&bytes[0..16]);

        let header = Self {
            transfer_id: TransferId::from_bytes(id_bytes),
            chunk_index: u64::from_le_bytes(bytes[16..24].try_into().unwrap()),
            chunk_offset: u64::from_le_bytes(bytes[24..32].try_into().unwrap()),
            original_size: u32::from_le_bytes(bytes[32..36].try_into().unwrap()),
            compressed_size: u32::from_le_bytes(bytes[36..40].try_into().unwrap()),
            checksum: u32::from_le_bytes(bytes[40..44].try_into().unwrap()),
            flags: bytes[44],
        };
        header.validate()?;
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ChunkHeader {
        ChunkHeader {
            transfer_id: TransferId::generate(),
            chunk_index: 7,
            chunk_offset: 7 * 256 * 1024,
            original_size: 256 * 1024,
            compressed_size: 100_000,
            checksum: 0xCBF4_3926,
            flags: flags::COMPRESSED,
        }
    }

    #[test]
    fn encode_is_exactly_48_bytes() {
        assert_eq!(sample().encode().len(), CHUNK_HEADER_SIZE);
    }

    #[test]
    fn round_trips_encode_decode() {
        let h = sample();
        let encoded = h.encode();
        let decoded = ChunkHeader::decode(&encoded).unwrap();
        assert_eq!(h, decoded);
        assert_eq!(decoded.encode(), encoded);
    }

    #[test]
    fn rejects_non_zero_reserved_bytes() {
        let mut encoded = sample().encode();
        encoded[46] = 1;
        assert!(matches!(
            ChunkHeader::decode(&encoded),
            Err(TransferError::ChunkSizeError)
        ));
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            ChunkHeader::decode(&[0u8; 47]),
            Err(TransferError::ChunkSizeError)
        ));
    }

    #[test]
    fn uncompressed_requires_equal_sizes() {
        let mut h = sample();
        h.flags = 0;
        h.compressed_size = h.original_size + 1;
        assert!(h.validate().is_err());
    }

    #[test]
    fn single_chunk_transfer_carries_both_flags() {
        let mut h = sample();
        h.flags = flags::FIRST | flags::LAST;
        assert!(h.is_first());
        assert!(h.is_last());
    }
}
