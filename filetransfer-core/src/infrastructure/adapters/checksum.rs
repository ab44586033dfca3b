// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Checksum Adapter
//!
//! CRC32/IEEE-802.3 via `crc32fast` (table-driven, matches the polynomial
//! `0xEDB88320` with the standard `0xFFFFFFFF` init/final-XOR) and
//! streaming SHA-256 via `sha2` (§4.A).

use sha2::{Digest, Sha256};

use filetransfer_domain::services::{ChecksumService, Sha256Stream};

#[derive(Debug, Default)]
pub struct Crc32Sha256Checksum;

impl Crc32Sha256Checksum {
    pub fn new() -> Self {
        Self
    }
}

struct Sha256StreamImpl {
    hasher: Sha256,
}

impl Sha256Stream for Sha256StreamImpl {
    fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    fn finalize_hex(self: Box<Self>) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl ChecksumService for Crc32Sha256Checksum {
    fn crc32(&self, bytes: &[u8]) -> u32 {
        crc32fast::hash(bytes)
    }

    fn sha256_stream(&self) -> Box<dyn Sha256Stream> {
        Box::new(Sha256StreamImpl { hasher: Sha256::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_matches_reference_vector() {
        let checksum = Crc32Sha256Checksum::new();
        assert_eq!(checksum.crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn sha256_matches_reference_vector() {
        let checksum = Crc32Sha256Checksum::new();
        let mut stream = checksum.sha256_stream();
        stream.update(b"abc");
        assert_eq!(
            stream.finalize_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a3396177a9cb410ff61f20015"
        );
    }

    #[test]
    fn verify_crc32_detects_mismatch() {
        let checksum = Crc32Sha256Checksum::new();
        assert!(checksum.verify_crc32(b"123456789", 0xCBF4_3926));
        assert!(!checksum.verify_crc32(b"123456789", 0));
    }

    #[test]
    fn sha256_of_empty_input_matches_boundary_vector() {
        let checksum = Crc32Sha256Checksum::new();
        let stream = checksum.sha256_stream();
        assert_eq!(
            stream.finalize_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
        );
    }
}
