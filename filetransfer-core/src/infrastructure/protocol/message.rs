// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Protocol Messages (§4.G)
//!
//! The handshake and chunk-exchange vocabulary exchanged between client
//! and server over a byte stream (TCP today, QUIC streams once §4.J is
//! wired up — this module is transport-agnostic). Every variant carries
//! the [`TransferId`] it belongs to so a server can multiplex several
//! transfers over the same connection.

use filetransfer_domain::value_objects::{ChunkHeader, TransferId};
use serde::{Deserialize, Serialize};

/// One frame of the chunked transfer protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProtocolMessage {
    /// Client -> server: "I want to upload `filename`."
    UploadRequest { transfer_id: TransferId, filename: String, file_size: u64, total_chunks: u64, sha256_hash: String },
    /// Server -> client: upload accepted; `resume_from_chunk` is `Some` when
    /// the server recognizes a partial upload under this name.
    UploadAccept { transfer_id: TransferId, resume_from_chunk: Option<u64> },
    UploadReject { transfer_id: TransferId, reason: String },

    /// Client -> server: "send me `filename`."
    DownloadRequest { transfer_id: TransferId, filename: String, resume_from_chunk: Option<u64> },
    /// Server -> client: download accepted, describing the file to expect.
    DownloadAccept { transfer_id: TransferId, file_size: u64, total_chunks: u64, sha256_hash: String },
    DownloadReject { transfer_id: TransferId, reason: String },

    /// Either direction: one chunk's header and payload.
    ChunkData { transfer_id: TransferId, header: ChunkHeader, payload: Vec<u8> },
    /// Acknowledges a chunk whose CRC32 verified.
    ChunkAck { transfer_id: TransferId, chunk_index: u64 },
    /// Rejects a chunk whose CRC32 did not verify; the sender is expected
    /// to retransmit the same `chunk_index` (§4.G "chunk re-request on CRC
    /// mismatch").
    ChunkNack { transfer_id: TransferId, chunk_index: u64, reason: String },

    /// Client -> server: resume an interrupted transfer, derived from a
    /// persisted [`filetransfer_domain::value_objects::ResumeState`].
    ResumeRequest {
        transfer_id: TransferId,
        filename: String,
        file_hash: String,
        file_size: u64,
        last_chunk_index: u64,
        missing_chunks: Vec<u64>,
    },
    ResumeAccept { transfer_id: TransferId, resume_from_chunk: u64 },
    ResumeReject { transfer_id: TransferId, reason: String },

    /// Either direction: the transfer finished, successfully or not.
    TransferComplete { transfer_id: TransferId, success: bool, bytes_transferred: u64, error_message: Option<String> },
}

impl ProtocolMessage {
    /// The transfer this frame belongs to, for routing on a shared
    /// connection.
    pub fn transfer_id(&self) -> TransferId {
        match self {
            Self::UploadRequest { transfer_id, .. }
            | Self::UploadAccept { transfer_id, .. }
            | Self::UploadReject { transfer_id, .. }
            | Self::DownloadRequest { transfer_id, .. }
            | Self::DownloadAccept { transfer_id, .. }
            | Self::DownloadReject { transfer_id, .. }
            | Self::ChunkData { transfer_id, .. }
            | Self::ChunkAck { transfer_id, .. }
            | Self::ChunkNack { transfer_id, .. }
            | Self::ResumeRequest { transfer_id, .. }
            | Self::ResumeAccept { transfer_id, .. }
            | Self::ResumeReject { transfer_id, .. }
            | Self::TransferComplete { transfer_id, .. } => *transfer_id,
        }
    }

    /// The one-byte wire tag carried ahead of the JSON body, so a reader
    /// can dispatch without parsing JSON first (§4.G wire format).
    pub fn message_type(&self) -> u8 {
        match self {
            Self::UploadRequest { .. } => 0x01,
            Self::UploadAccept { .. } => 0x02,
            Self::UploadReject { .. } => 0x03,
            Self::DownloadRequest { .. } => 0x04,
            Self::DownloadAccept { .. } => 0x05,
            Self::DownloadReject { .. } => 0x06,
            Self::ChunkData { .. } => 0x07,
            Self::ChunkAck { .. } => 0x08,
            Self::ChunkNack { .. } => 0x09,
            Self::ResumeRequest { .. } => 0x0A,
            Self::ResumeAccept { .. } => 0x0B,
            Self::ResumeReject { .. } => 0x0C,
            Self::TransferComplete { .. } => 0x0D,
        }
    }
}
