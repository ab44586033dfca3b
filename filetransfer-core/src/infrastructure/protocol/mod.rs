// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunked Transfer Protocol (§4.G)
//!
//! The handshake, chunk-exchange, and resume vocabulary exchanged between
//! a client and server over a connected byte stream, plus the drivers on
//! each side of that exchange. Transport-agnostic: today's callers hand
//! this a `TcpStream`, and a QUIC stream (§4.J) satisfies the same
//! `Read + Write` bound without any change here.

pub mod client_session;
pub mod codec;
pub mod message;
pub mod reconnect;
pub mod server_session;

pub use client_session::{ClientSession, MAX_CHUNK_RETRIES};
pub use codec::{read_message, write_message, MAX_FRAME_BYTES};
pub use message::ProtocolMessage;
pub use reconnect::{reconnect_with_backoff, ReconnectPolicy};
pub use server_session::{ServerSession, ServerSessionHandlers};

#[cfg(test)]
mod integration_tests {
    use std::net::{TcpListener, TcpStream};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    use filetransfer_domain::services::ChecksumService;
    use filetransfer_domain::value_objects::{Chunk, ChunkHeader, TransferId};

    use crate::infrastructure::adapters::Crc32Sha256Checksum;

    use super::*;

    fn sample_chunks(checksum: &Crc32Sha256Checksum, transfer_id: TransferId, count: u64) -> Vec<Chunk> {
        (0..count)
            .map(|i| {
                let payload = vec![i as u8; 16];
                let header = ChunkHeader {
                    transfer_id,
                    chunk_index: i,
                    chunk_offset: i * 16,
                    original_size: 16,
                    compressed_size: 16,
                    checksum: checksum.crc32(&payload),
                    flags: if i == 0 { 0x01 } else { 0 },
                };
                Chunk::new(header, payload)
            })
            .collect()
    }

    #[test]
    fn upload_round_trips_over_a_tcp_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let checksum: Arc<dyn ChecksumService> = Arc::new(Crc32Sha256Checksum::default());
        let transfer_id = TransferId::generate();
        let chunks = sample_chunks(&Crc32Sha256Checksum::default(), transfer_id, 3);

        let received = Arc::new(Mutex::new(Vec::<Vec<u8>>::new()));
        let received_in_thread = received.clone();
        let server_checksum = checksum.clone();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let handlers = ServerSessionHandlers {
                accept_upload: Box::new(|_name, _size| Ok(None)),
                accept_download: Box::new(|_name| Err("not used in this test".to_string())),
                accept_resume: Box::new(|_name, _hash, _size| Err("not used in this test".to_string())),
                write_chunk: Box::new(move |_id, _offset, bytes| {
                    received_in_thread.lock().unwrap().push(bytes.to_vec());
                    Ok(())
                }),
                read_chunk: Box::new(|_id, _offset, _size| Ok(Vec::new())),
            };
            let mut session = ServerSession::new(stream, server_checksum, handlers);
            session.handle_one().unwrap();
        });

        let stream = TcpStream::connect(addr).unwrap();
        let mut client = ClientSession::new(stream, checksum);
        client.upload(transfer_id, "report.bin", 48, "deadbeef", &chunks).unwrap();

        server.join().unwrap();
        assert_eq!(received.lock().unwrap().len(), 3);
    }

    #[test]
    fn corrupted_chunk_is_nacked_and_never_reaches_storage() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let checksum: Arc<dyn ChecksumService> = Arc::new(Crc32Sha256Checksum::default());
        let transfer_id = TransferId::generate();

        // A chunk whose declared checksum does not match its payload, as if
        // corrupted in transit.
        let bad_header = ChunkHeader {
            transfer_id,
            chunk_index: 0,
            chunk_offset: 0,
            original_size: 16,
            compressed_size: 16,
            checksum: 0xDEAD_BEEF,
            flags: 0x01 | 0x02,
        };
        let chunks = vec![Chunk::new(bad_header, vec![0u8; 16])];

        let writes = Arc::new(AtomicU32::new(0));
        let writes_in_thread = writes.clone();
        let server_checksum = checksum.clone();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let handlers = ServerSessionHandlers {
                accept_upload: Box::new(|_name, _size| Ok(None)),
                accept_download: Box::new(|_name| Err("not used".to_string())),
                accept_resume: Box::new(|_name, _hash, _size| Err("not used".to_string())),
                write_chunk: Box::new(move |_id, _offset, _bytes| {
                    writes_in_thread.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
                read_chunk: Box::new(|_id, _offset, _size| Ok(Vec::new())),
            };
            let mut session = ServerSession::new(stream, server_checksum, handlers);
            // The client gives up after MAX_CHUNK_RETRIES nacked resends,
            // so the handler returns an error rather than completing.
            assert!(session.handle_one().is_err());
        });

        let stream = TcpStream::connect(addr).unwrap();
        let mut client = ClientSession::new(stream, checksum);
        let result = client.upload(transfer_id, "report.bin", 16, "deadbeef", &chunks);

        server.join().unwrap();
        assert!(result.is_err());
        assert_eq!(writes.load(Ordering::SeqCst), 0);
    }
}
