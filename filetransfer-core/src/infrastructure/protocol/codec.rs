// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Wire Codec (§4.G)
//!
//! Length-prefixed framing: a 1-byte message-type tag, a 4-byte
//! little-endian body length, then the `serde_json`-encoded
//! [`ProtocolMessage`]. JSON over a hand-rolled binary TLV trades a few
//! bytes per frame for a protocol a human can read off the wire with
//! `tcpdump -A`; the chunk header inside `ChunkData` is the only field
//! that would otherwise be binary, and it is small relative to its
//! payload.
//!
//! Generic over `Read`/`Write` rather than tied to `TcpStream` or a QUIC
//! stream type, so the protocol layer is exercised in tests without a
//! live socket.

use std::io::{Read, Write};

use filetransfer_domain::errors::TransferError;

use super::message::ProtocolMessage;

/// Frames longer than this are rejected before their body is read, so a
/// corrupt or malicious length prefix can't force an unbounded allocation.
pub const MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;

const HEADER_LEN: usize = 5;

/// Encodes `message` into its framed wire form.
pub fn encode(message: &ProtocolMessage) -> Result<Vec<u8>, TransferError> {
    let body = serde_json::to_vec(message).map_err(|e| TransferError::ConfigInvalid(e.to_string()))?;
    if body.len() as u64 > MAX_FRAME_BYTES as u64 {
        return Err(TransferError::ChunkSizeError);
    }
    let mut framed = Vec::with_capacity(HEADER_LEN + body.len());
    framed.push(message.message_type());
    framed.extend_from_slice(&(body.len() as u32).to_le_bytes());
    framed.extend_from_slice(&body);
    Ok(framed)
}

/// Writes one framed message to `writer`.
pub fn write_message(writer: &mut impl Write, message: &ProtocolMessage) -> Result<(), TransferError> {
    let framed = encode(message)?;
    writer.write_all(&framed)?;
    Ok(())
}

/// Reads one framed message from `reader`, blocking until a full frame
/// arrives or the stream closes.
pub fn read_message(reader: &mut impl Read) -> Result<ProtocolMessage, TransferError> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header)?;
    let body_len = u32::from_le_bytes(header[1..5].try_into().unwrap());
    if body_len > MAX_FRAME_BYTES {
        return Err(TransferError::ChunkSizeError);
    }

    let mut body = vec![0u8; body_len as usize];
    reader.read_exact(&mut body)?;
    serde_json::from_slice(&body).map_err(|e| TransferError::ConfigInvalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetransfer_domain::value_objects::TransferId;
    use std::io::Cursor;

    #[test]
    fn round_trips_through_a_byte_stream() {
        let message = ProtocolMessage::UploadRequest {
            transfer_id: TransferId::generate(),
            filename: "report.pdf".to_string(),
            file_size: 4096,
            total_chunks: 16,
            sha256_hash: "abc123".to_string(),
        };

        let framed = encode(&message).unwrap();
        assert_eq!(framed[0], 0x01);

        let mut cursor = Cursor::new(framed);
        let decoded = read_message(&mut cursor).unwrap();
        assert_eq!(decoded.transfer_id(), message.transfer_id());
        assert!(matches!(decoded, ProtocolMessage::UploadRequest { .. }));
    }

    #[test]
    fn rejects_a_frame_longer_than_the_configured_maximum() {
        let mut header = vec![0x08u8];
        header.extend_from_slice(&(MAX_FRAME_BYTES + 1).to_le_bytes());
        let mut cursor = Cursor::new(header);
        assert!(matches!(read_message(&mut cursor), Err(TransferError::ChunkSizeError)));
    }

    #[test]
    fn read_on_a_closed_stream_surfaces_an_io_error() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert!(read_message(&mut cursor).is_err());
    }
}
