// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Server-Side Session Driver (§4.G)
//!
//! Handles one connection's handshake and chunk exchange, driving a
//! [`TransferSession`] through its lifecycle. Ported from
//! `original_source/src/server/file_transfer_server.cpp`'s
//! `on_upload_request`/`on_download_request` handlers, adapted to this
//! workspace's synchronous stream style and its storage-agnostic
//! `write_chunk`/`read_chunk` hooks (mirroring
//! [`crate::infrastructure::pipeline::PipelineContext`]'s `write_sink`/
//! `read_source`).

use std::io::{Read, Write};
use std::sync::Arc;

use filetransfer_domain::entities::{SessionState, TransferSession};
use filetransfer_domain::errors::TransferError;
use filetransfer_domain::services::ChecksumService;
use filetransfer_domain::value_objects::{Chunk, ChunkHeader, TransferId};

use super::client_session::MAX_CHUNK_RETRIES;
use super::codec::{read_message, write_message};
use super::message::ProtocolMessage;

/// Storage and policy hooks the server session calls into; kept as plain
/// closures rather than a trait since one connection only ever needs one
/// live implementation at a time (§9 "callbacks as interfaces").
pub struct ServerSessionHandlers {
    /// Decides whether to accept an upload; `Ok(Some(n))` resumes from
    /// chunk `n`, `Ok(None)` starts fresh, `Err(reason)` rejects.
    pub accept_upload: Box<dyn Fn(&str, u64) -> Result<Option<u64>, String> + Send + Sync>,
    /// Decides whether to accept a download, returning
    /// `(file_size, total_chunks, sha256_hash)` on acceptance.
    pub accept_download: Box<dyn Fn(&str) -> Result<(u64, u64, String), String> + Send + Sync>,
    /// Decides whether a resume request matches known server-side state,
    /// returning the chunk index to resume from.
    pub accept_resume: Box<dyn Fn(&str, &str, u64) -> Result<u64, String> + Send + Sync>,
    pub write_chunk: Box<dyn Fn(TransferId, u64, &[u8]) -> Result<(), TransferError> + Send + Sync>,
    pub read_chunk: Box<dyn Fn(TransferId, u64, u32) -> Result<Vec<u8>, TransferError> + Send + Sync>,
}

/// Drives the server side of the chunked transfer protocol over `stream`.
pub struct ServerSession<S> {
    stream: S,
    checksum: Arc<dyn ChecksumService>,
    handlers: ServerSessionHandlers,
}

impl<S: Read + Write> ServerSession<S> {
    pub fn new(stream: S, checksum: Arc<dyn ChecksumService>, handlers: ServerSessionHandlers) -> Self {
        Self { stream, checksum, handlers }
    }

    /// Reads and dispatches exactly one handshake request. Most
    /// connections carry a single transfer, so callers typically call
    /// this once per accepted connection.
    pub fn handle_one(&mut self) -> Result<(), TransferError> {
        match read_message(&mut self.stream)? {
            ProtocolMessage::UploadRequest { transfer_id, filename, file_size, total_chunks, .. } => {
                self.handle_upload(transfer_id, &filename, file_size, total_chunks)
            }
            ProtocolMessage::DownloadRequest { transfer_id, filename, .. } => self.handle_download(transfer_id, &filename),
            ProtocolMessage::ResumeRequest { transfer_id, filename, file_hash, file_size, .. } => {
                self.handle_resume(transfer_id, &filename, &file_hash, file_size)
            }
            _ => Err(TransferError::ProtocolMismatch),
        }
    }

    fn handle_upload(&mut self, transfer_id: TransferId, filename: &str, file_size: u64, total_chunks: u64) -> Result<(), TransferError> {
        let mut session = TransferSession::new(transfer_id);

        let resume_from_chunk = match (self.handlers.accept_upload)(filename, file_size) {
            Ok(resume) => resume,
            Err(reason) => {
                write_message(&mut self.stream, &ProtocolMessage::UploadReject { transfer_id, reason: reason.clone() })?;
                return Err(TransferError::UploadRejected(reason));
            }
        };
        write_message(&mut self.stream, &ProtocolMessage::UploadAccept { transfer_id, resume_from_chunk })?;
        session.transition(SessionState::Initializing)?;
        session.transition(SessionState::Transferring)?;

        let start = resume_from_chunk.unwrap_or(0);
        for _ in start..total_chunks {
            self.recv_chunk_with_retry(transfer_id)?;
        }

        match read_message(&mut self.stream)? {
            ProtocolMessage::TransferComplete { success: true, .. } => {
                session.transition(SessionState::Verifying)?;
                session.transition(SessionState::Completing)?;
                session.transition(SessionState::Completed)?;
                Ok(())
            }
            _ => {
                session.transition(SessionState::Failed)?;
                Err(TransferError::TransferCancelled)
            }
        }
    }

    fn handle_download(&mut self, transfer_id: TransferId, filename: &str) -> Result<(), TransferError> {
        let (file_size, total_chunks, sha256_hash) = match (self.handlers.accept_download)(filename) {
            Ok(info) => info,
            Err(reason) => {
                write_message(&mut self.stream, &ProtocolMessage::DownloadReject { transfer_id, reason: reason.clone() })?;
                return Err(TransferError::DownloadRejected(reason));
            }
        };
        write_message(&mut self.stream, &ProtocolMessage::DownloadAccept { transfer_id, file_size, total_chunks, sha256_hash })?;

        let chunk_size = if total_chunks == 0 { 0 } else { file_size.div_ceil(total_chunks) };
        for chunk_index in 0..total_chunks {
            let offset = chunk_index * chunk_size;
            let remaining = file_size.saturating_sub(offset);
            let this_size = remaining.min(chunk_size) as u32;
            self.send_chunk_with_retry(transfer_id, chunk_index, offset, this_size)?;
        }

        write_message(&mut self.stream, &ProtocolMessage::TransferComplete { transfer_id, success: true, bytes_transferred: file_size, error_message: None })?;
        Ok(())
    }

    fn handle_resume(&mut self, transfer_id: TransferId, filename: &str, file_hash: &str, file_size: u64) -> Result<(), TransferError> {
        match (self.handlers.accept_resume)(filename, file_hash, file_size) {
            Ok(resume_from_chunk) => {
                write_message(&mut self.stream, &ProtocolMessage::ResumeAccept { transfer_id, resume_from_chunk })?;
                Ok(())
            }
            Err(reason) => {
                write_message(&mut self.stream, &ProtocolMessage::ResumeReject { transfer_id, reason })?;
                Err(TransferError::ResumeSessionMismatch)
            }
        }
    }

    fn recv_chunk_with_retry(&mut self, transfer_id: TransferId) -> Result<(), TransferError> {
        for attempt in 0..=MAX_CHUNK_RETRIES {
            match read_message(&mut self.stream)? {
                ProtocolMessage::ChunkData { header, payload, .. } => {
                    if self.checksum.verify_crc32(&payload, header.checksum) {
                        (self.handlers.write_chunk)(transfer_id, header.chunk_offset, &payload)?;
                        write_message(&mut self.stream, &ProtocolMessage::ChunkAck { transfer_id, chunk_index: header.chunk_index })?;
                        return Ok(());
                    }
                    write_message(
                        &mut self.stream,
                        &ProtocolMessage::ChunkNack { transfer_id, chunk_index: header.chunk_index, reason: "crc32 mismatch".to_string() },
                    )?;
                    if attempt == MAX_CHUNK_RETRIES {
                        return Err(TransferError::ChunkChecksumError(header.chunk_index));
                    }
                }
                _ => return Err(TransferError::ProtocolMismatch),
            }
        }
        Err(TransferError::ChunkTimeout)
    }

    fn send_chunk_with_retry(&mut self, transfer_id: TransferId, chunk_index: u64, offset: u64, size: u32) -> Result<(), TransferError> {
        for attempt in 0..=MAX_CHUNK_RETRIES {
            let bytes = (self.handlers.read_chunk)(transfer_id, offset, size)?;
            let header = ChunkHeader {
                transfer_id,
                chunk_index,
                chunk_offset: offset,
                original_size: bytes.len() as u32,
                compressed_size: bytes.len() as u32,
                checksum: self.checksum.crc32(&bytes),
                flags: 0,
            };
            let chunk = Chunk::new(header, bytes);
            write_message(&mut self.stream, &ProtocolMessage::ChunkData { transfer_id, header: chunk.header, payload: chunk.payload })?;

            match read_message(&mut self.stream)? {
                ProtocolMessage::ChunkAck { .. } => return Ok(()),
                ProtocolMessage::ChunkNack { .. } if attempt < MAX_CHUNK_RETRIES => continue,
                ProtocolMessage::ChunkNack { .. } => return Err(TransferError::ChunkChecksumError(chunk_index)),
                _ => return Err(TransferError::ProtocolMismatch),
            }
        }
        Err(TransferError::ChunkChecksumError(chunk_index))
    }
}
