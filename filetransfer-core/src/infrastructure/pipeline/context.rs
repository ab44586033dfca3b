// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Context and Stages (§4.F)
//!
//! The shared, immutable state every job observes: queue handles,
//! per-worker engines indexed by `worker_id` (no locking on the hot
//! path), statistics, the running flag, bandwidth limiters, and the four
//! caller callbacks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use filetransfer_domain::services::{BandwidthLimiter, ChecksumService, CompressionService};
use filetransfer_domain::value_objects::{Chunk, TransferId};
use filetransfer_domain::TransferError;

use crate::infrastructure::stats::StatisticsCollector;

/// One processing step a chunk moves through. Upload chunks flow
/// `Decompress -> Decrypt -> Verify -> Write`; download chunks flow
/// `Read -> Encrypt -> Compress -> Send` (§4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Decompress,
    Decrypt,
    Verify,
    Write,
    Read,
    Encrypt,
    Compress,
    Send,
}

impl StageKind {
    pub const UPLOAD_STAGES: [StageKind; 4] = [StageKind::Decompress, StageKind::Decrypt, StageKind::Verify, StageKind::Write];
    pub const DOWNLOAD_STAGES: [StageKind; 4] = [StageKind::Read, StageKind::Encrypt, StageKind::Compress, StageKind::Send];

    /// The next stage in this chunk's pipeline, or `None` if `self` is the
    /// terminal stage for its direction.
    pub fn next(&self) -> Option<StageKind> {
        match self {
            StageKind::Decompress => Some(StageKind::Decrypt),
            StageKind::Decrypt => Some(StageKind::Verify),
            StageKind::Verify => Some(StageKind::Write),
            StageKind::Write => None,
            StageKind::Read => Some(StageKind::Encrypt),
            StageKind::Encrypt => Some(StageKind::Compress),
            StageKind::Compress => Some(StageKind::Send),
            StageKind::Send => None,
        }
    }

    pub fn is_final(&self) -> bool {
        self.next().is_none()
    }

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Decompress => "decompress",
            StageKind::Decrypt => "decrypt",
            StageKind::Verify => "verify",
            StageKind::Write => "write",
            StageKind::Read => "read",
            StageKind::Encrypt => "encrypt",
            StageKind::Compress => "compress",
            StageKind::Send => "send",
        }
    }
}

/// A unit of work handed between stages. Jobs are re-entrant-safe and own
/// their chunk outright — ownership moves through stages rather than
/// being cloned (§9 "manual memory / pointer graphs").
pub struct Job {
    pub transfer_id: TransferId,
    pub chunk: Chunk,
    pub stage: StageKind,
    pub worker_id: usize,
    pub cancellation: Arc<AtomicBool>,
}

/// Callbacks the pipeline context delivers from background worker
/// threads. Callees must be reentrant-safe (§9 "callbacks as interfaces").
pub struct PipelineCallbacks {
    pub stage_complete: Box<dyn Fn(StageKind, &Chunk) + Send + Sync>,
    pub error: Box<dyn Fn(StageKind, &str) + Send + Sync>,
    pub upload_complete: Box<dyn Fn(TransferId, Result<(), TransferError>) + Send + Sync>,
    pub download_ready: Box<dyn Fn(Chunk) + Send + Sync>,
}

impl Default for PipelineCallbacks {
    fn default() -> Self {
        Self {
            stage_complete: Box::new(|_, _| {}),
            error: Box::new(|_, _| {}),
            upload_complete: Box::new(|_, _| {}),
            download_ready: Box::new(|_| {}),
        }
    }
}

/// Read/write hooks to the actual storage backing a transfer. Kept as
/// plain closures rather than a trait since the pipeline only ever needs
/// one implementation live at a time, supplied by the application layer
/// per transfer.
pub type WriteSink = dyn Fn(TransferId, u64, &[u8]) -> Result<(), TransferError> + Send + Sync;
pub type ReadSource = dyn Fn(TransferId, u64, u32) -> Result<Vec<u8>, TransferError> + Send + Sync;

/// Shared, immutable state every job observes. Constructed once at
/// [`super::ServerPipeline::start`] and held behind an `Arc`.
pub struct PipelineContext {
    pub compression_engines: Vec<Arc<dyn CompressionService>>,
    pub checksum: Arc<dyn ChecksumService>,
    pub stats: Arc<StatisticsCollector>,
    pub running: Arc<AtomicBool>,
    pub recv_limiter: Arc<dyn BandwidthLimiter>,
    pub send_limiter: Arc<dyn BandwidthLimiter>,
    pub callbacks: PipelineCallbacks,
    pub write_sink: Box<WriteSink>,
    pub read_source: Box<ReadSource>,
    pub backpressure_events: AtomicU64,
    pub stall_detected: AtomicU64,
    pub chunks_processed: AtomicU64,
    pub bytes_processed: AtomicU64,
    pub compression_saved_bytes: AtomicU64,
}

impl PipelineContext {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn record_final_stage(&self, payload_len: u64) {
        self.chunks_processed.fetch_add(1, Ordering::Relaxed);
        self.bytes_processed.fetch_add(payload_len, Ordering::Relaxed);
    }

    pub fn record_compression_saving(&self, original_size: u32, compressed_size: u32) {
        if compressed_size < original_size {
            self.compression_saved_bytes.fetch_add((original_size - compressed_size) as u64, Ordering::Relaxed);
        }
    }
}
