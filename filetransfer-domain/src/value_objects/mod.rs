// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Value Objects
//!
//! Immutable data without identity: chunk framing, file metadata, resume
//! state, cloud object metadata, quota snapshots, session tickets, and
//! network paths.

pub mod chunk;
pub mod chunk_header;
pub mod cloud_object_metadata;
pub mod file_metadata;
pub mod network_path;
pub mod quota_usage;
pub mod resume_state;
pub mod session_ticket;
pub mod transfer_id;

pub use chunk::{Chunk, ChunkMetadata, ChunkStatistics};
pub use chunk_header::{flags as chunk_flags, ChunkHeader, CHUNK_HEADER_SIZE};
pub use cloud_object_metadata::CloudObjectMetadata;
pub use file_metadata::FileMetadata;
pub use network_path::NetworkPath;
pub use quota_usage::QuotaUsage;
pub use resume_state::{ResumeState, TransferDirection};
pub use session_ticket::SessionTicket;
pub use transfer_id::TransferId;
