// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transfer ID Value Object
//!
//! A 128-bit UUID (v4) identifying one logical upload or download. The
//! textual form is the canonical hyphenated hex representation; the null
//! value (all-zero bytes) represents "no transfer" in contexts like
//! [`crate::value_objects::resume_state::ResumeState`].

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a transfer session.
///
/// Ordered lexicographically by the underlying 16 bytes, matching the
/// `operator<` total order used by the wire-level `transfer_id` type this
/// value object was distilled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransferId(Uuid);

impl TransferId {
    /// Generates a new random (v4) transfer ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The null transfer ID (all-zero bytes), used as a sentinel.
    pub const fn null() -> Self {
        Self(Uuid::nil())
    }

    /// Whether this ID is the all-zero sentinel.
    pub fn is_null(&self) -> bool {
        self.0.is_nil()
    }

    /// Raw 16-byte representation, as carried in the wire [`ChunkHeader`].
    ///
    /// [`ChunkHeader`]: crate::value_objects::chunk_header::ChunkHeader
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Builds a transfer ID from its raw 16-byte wire representation.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Parses the canonical hyphenated hex form, returning `None` on any
    /// malformed input rather than an error — transfer IDs are parsed from
    /// untrusted wire data and callers are expected to treat parse failure
    /// as "reject the frame".
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_all_zero() {
        assert!(TransferId::null().is_null());
        assert_eq!(TransferId::null().as_bytes(), &[0u8; 16]);
    }

    #[test]
    fn generate_produces_non_null_unique_ids() {
        let a = TransferId::generate();
        let b = TransferId::generate();
        assert!(!a.is_null());
        assert_ne!(a, b);
    }

    #[test]
    fn round_trips_through_string() {
        let id = TransferId::generate();
        let s = id.to_string();
        assert_eq!(TransferId::from_string(&s), Some(id));
    }

    #[test]
    fn rejects_malformed_string() {
        assert_eq!(TransferId::from_string("not-a-uuid"), None);
    }

    #[test]
    fn ordering_is_lexicographic_by_bytes() {
        let a = TransferId::from_bytes([0; 16]);
        let mut hi = [0u8; 16];
        hi[0] = 1;
        let b = TransferId::from_bytes(hi);
        assert!(a < b);
    }
}
