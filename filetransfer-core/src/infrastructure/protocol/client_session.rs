// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Client-Side Session Driver (§4.G)
//!
//! Drives one upload or download over an already-connected byte stream:
//! sends the handshake request, waits for accept/reject, then exchanges
//! chunks one at a time, retrying a chunk up to [`MAX_CHUNK_RETRIES`]
//! times when the server nacks it (CRC32 mismatch). Ported from the
//! `file_transfer_client` upload/download flow in
//! `original_source/src/client/file_transfer_client.cpp`, adapted to this
//! workspace's synchronous stream style rather than that client's
//! callback-driven async I/O.

use std::io::{Read, Write};
use std::sync::Arc;

use filetransfer_domain::errors::TransferError;
use filetransfer_domain::services::ChecksumService;
use filetransfer_domain::value_objects::{Chunk, ResumeState, TransferId};

use super::codec::{read_message, write_message};
use super::message::ProtocolMessage;

/// Retries a single nacked chunk this many times before giving up on the
/// whole transfer.
pub const MAX_CHUNK_RETRIES: u32 = 3;

/// Drives the client side of the chunked transfer protocol over `stream`.
pub struct ClientSession<S> {
    stream: S,
    checksum: Arc<dyn ChecksumService>,
}

impl<S: Read + Write> ClientSession<S> {
    pub fn new(stream: S, checksum: Arc<dyn ChecksumService>) -> Self {
        Self { stream, checksum }
    }

    /// Uploads `chunks` under `filename`, performing the
    /// `UploadRequest`/`UploadAccept` handshake first. If the server
    /// accepts with `resume_from_chunk` set, only the chunks from that
    /// index onward are sent.
    pub fn upload(&mut self, transfer_id: TransferId, filename: &str, file_size: u64, sha256_hash: &str, chunks: &[Chunk]) -> Result<(), TransferError> {
        write_message(
            &mut self.stream,
            &ProtocolMessage::UploadRequest {
                transfer_id,
                filename: filename.to_string(),
                file_size,
                total_chunks: chunks.len() as u64,
                sha256_hash: sha256_hash.to_string(),
            },
        )?;

        let resume_from_chunk = match read_message(&mut self.stream)? {
            ProtocolMessage::UploadAccept { resume_from_chunk, .. } => resume_from_chunk.unwrap_or(0),
            ProtocolMessage::UploadReject { reason, .. } => return Err(TransferError::UploadRejected(reason)),
            _ => return Err(TransferError::ProtocolMismatch),
        };

        for chunk in &chunks[resume_from_chunk as usize..] {
            self.send_chunk_with_retry(transfer_id, chunk)?;
        }

        write_message(
            &mut self.stream,
            &ProtocolMessage::TransferComplete { transfer_id, success: true, bytes_transferred: file_size, error_message: None },
        )?;
        Ok(())
    }

    /// Requests `filename` from the server and receives every chunk,
    /// verifying each against its CRC32 and nacking (triggering a resend)
    /// on mismatch.
    pub fn download(&mut self, transfer_id: TransferId, filename: &str) -> Result<Vec<Chunk>, TransferError> {
        write_message(&mut self.stream, &ProtocolMessage::DownloadRequest { transfer_id, filename: filename.to_string(), resume_from_chunk: None })?;

        let total_chunks = match read_message(&mut self.stream)? {
            ProtocolMessage::DownloadAccept { total_chunks, .. } => total_chunks,
            ProtocolMessage::DownloadReject { reason, .. } => return Err(TransferError::DownloadRejected(reason)),
            _ => return Err(TransferError::ProtocolMismatch),
        };

        let mut chunks = Vec::with_capacity(total_chunks as usize);
        for _ in 0..total_chunks {
            chunks.push(self.recv_chunk_with_retry(transfer_id)?);
        }
        Ok(chunks)
    }

    /// Resumes a previously interrupted transfer using a persisted
    /// [`ResumeState`], returning the chunk index the server agrees to
    /// resume from.
    pub fn resume(&mut self, state: &ResumeState) -> Result<u64, TransferError> {
        write_message(
            &mut self.stream,
            &ProtocolMessage::ResumeRequest {
                transfer_id: state.transfer_id,
                filename: state.remote_name.clone(),
                file_hash: state.file_hash.clone(),
                file_size: state.file_size,
                last_chunk_index: state.last_chunk_index,
                missing_chunks: state.missing_chunks.clone(),
            },
        )?;

        match read_message(&mut self.stream)? {
            ProtocolMessage::ResumeAccept { resume_from_chunk, .. } => Ok(resume_from_chunk),
            ProtocolMessage::ResumeReject { .. } => Err(TransferError::ResumeSessionMismatch),
            _ => Err(TransferError::ProtocolMismatch),
        }
    }

    fn send_chunk_with_retry(&mut self, transfer_id: TransferId, chunk: &Chunk) -> Result<(), TransferError> {
        for attempt in 0..=MAX_CHUNK_RETRIES {
            write_message(&mut self.stream, &ProtocolMessage::ChunkData { transfer_id, header: chunk.header, payload: chunk.payload.clone() })?;
            match read_message(&mut self.stream)? {
                ProtocolMessage::ChunkAck { .. } => return Ok(()),
                ProtocolMessage::ChunkNack { .. } if attempt < MAX_CHUNK_RETRIES => continue,
                ProtocolMessage::ChunkNack { .. } => return Err(TransferError::ChunkChecksumError(chunk.header.chunk_index)),
                _ => return Err(TransferError::ProtocolMismatch),
            }
        }
        Err(TransferError::ChunkChecksumError(chunk.header.chunk_index))
    }

    fn recv_chunk_with_retry(&mut self, transfer_id: TransferId) -> Result<Chunk, TransferError> {
        for attempt in 0..=MAX_CHUNK_RETRIES {
            match read_message(&mut self.stream)? {
                ProtocolMessage::ChunkData { header, payload, .. } => {
                    if self.checksum.verify_crc32(&payload, header.checksum) {
                        write_message(&mut self.stream, &ProtocolMessage::ChunkAck { transfer_id, chunk_index: header.chunk_index })?;
                        return Ok(Chunk::new(header, payload));
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::Crc32Sha256Checksum;
    use filetransfer_domain::value_objects::resume_state::TransferDirection;
    use std::io::Cursor;

    /// An in-memory duplex: writes go to `outbox`, reads come from a
    /// pre-scripted `inbox`, so a session can be driven without a socket.
    struct Duplex {
        inbox: Cursor<Vec<u8>>,
        outbox: Vec<u8>,
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inbox.read(buf)
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.outbox.write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn scripted(messages: &[ProtocolMessage]) -> Duplex {
        let mut bytes = Vec::new();
        for message in messages {
            write_message(&mut bytes, message).unwrap();
        }
        Duplex { inbox: Cursor::new(bytes), outbox: Vec::new() }
    }

    #[test]
    fn upload_reject_surfaces_the_servers_reason() {
        let transfer_id = TransferId::generate();
        let stream = scripted(&[ProtocolMessage::UploadReject { transfer_id, reason: "quota exceeded".to_string() }]);
        let mut client = ClientSession::new(stream, Arc::new(Crc32Sha256Checksum::default()));

        let result = client.upload(transfer_id, "f.bin", 0, "hash", &[]);
        assert!(matches!(result, Err(TransferError::UploadRejected(reason)) if reason == "quota exceeded"));
    }

    #[test]
    fn download_reject_surfaces_the_servers_reason() {
        let transfer_id = TransferId::generate();
        let stream = scripted(&[ProtocolMessage::DownloadReject { transfer_id, reason: "no such file".to_string() }]);
        let mut client = ClientSession::new(stream, Arc::new(Crc32Sha256Checksum::default()));

        let result = client.download(transfer_id, "missing.bin");
        assert!(matches!(result, Err(TransferError::DownloadRejected(reason)) if reason == "no such file"));
    }

    #[test]
    fn unexpected_reply_is_a_protocol_mismatch() {
        let transfer_id = TransferId::generate();
        let stream = scripted(&[ProtocolMessage::ChunkAck { transfer_id, chunk_index: 0 }]);
        let mut client = ClientSession::new(stream, Arc::new(Crc32Sha256Checksum::default()));

        let result = client.upload(transfer_id, "f.bin", 0, "hash", &[]);
        assert!(matches!(result, Err(TransferError::ProtocolMismatch)));
    }

    #[test]
    fn resume_accept_returns_the_servers_resume_point() {
        let transfer_id = TransferId::generate();
        let stream = scripted(&[ProtocolMessage::ResumeAccept { transfer_id, resume_from_chunk: 7 }]);
        let mut client = ClientSession::new(stream, Arc::new(Crc32Sha256Checksum::default()));

        let state = ResumeState {
            transfer_id,
            direction: TransferDirection::Upload,
            local_path: "/tmp/f.bin".to_string(),
            remote_name: "f.bin".to_string(),
            file_hash: "hash".to_string(),
            file_size: 1024,
            last_chunk_index: 6,
            last_offset: 6 * 256,
            saved_at: chrono::Utc::now(),
            missing_chunks: vec![],
        };
        assert_eq!(client.resume(&state).unwrap(), 7);
    }
}
