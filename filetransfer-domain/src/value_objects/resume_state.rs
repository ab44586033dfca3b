// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Resume State Value Object
//!
//! Persisted by the initiator of a transfer so an interrupted upload or
//! download can continue from its last acknowledged chunk after a
//! reconnect (§4.G "Resume").

use crate::value_objects::transfer_id::TransferId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side initiated the transfer this resume state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferDirection {
    Upload,
    Download,
}

/// Durable state letting a client resume an interrupted transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeState {
    pub transfer_id: TransferId,
    pub direction: TransferDirection,
    pub local_path: String,
    pub remote_name: String,
    pub file_hash: String,
    pub file_size: u64,
    pub last_chunk_index: u64,
    pub last_offset: u64,
    pub saved_at: DateTime<Utc>,
    pub missing_chunks: Vec<u64>,
}

impl ResumeState {
    /// `can_resume` holds iff the transfer ID is non-null and the file is
    /// non-empty (§3 invariant).
    pub fn can_resume(&self) -> bool {
        !self.transfer_id.is_null() && self.file_size > 0
    }

    /// Validates this resume state against the server's current view of the
    /// file (§4.G: "resume is permitted only if server-side sha256 and
    /// file_size match the resume state").
    pub fn matches_server(&self, server_sha256: &str, server_file_size: u64) -> bool {
        self.file_hash == server_sha256 && self.file_size == server_file_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResumeState {
        ResumeState {
            transfer_id: TransferId::generate(),
            direction: TransferDirection::Upload,
            local_path: "/tmp/f.bin".into(),
            remote_name: "f.bin".into(),
            file_hash: "abc123".into(),
            file_size: 1024,
            last_chunk_index: 4,
            last_offset: 4 * 256 * 1024,
            saved_at: Utc::now(),
            missing_chunks: vec![],
        }
    }

    #[test]
    fn can_resume_requires_non_null_id_and_nonzero_size() {
        assert!(sample().can_resume());

        let mut zero_size = sample();
        zero_size.file_size = 0;
        assert!(!zero_size.can_resume());

        let mut null_id = sample();
        null_id.transfer_id = TransferId::null();
        assert!(!null_id.can_resume());
    }

    #[test]
    fn mismatched_hash_invalidates_resume() {
        let state = sample();
        assert!(state.matches_server(&state.file_hash, state.file_size));
        assert!(!state.matches_server("different-hash", state.file_size));
        assert!(!state.matches_server(&state.file_hash, state.file_size + 1));
    }
}
