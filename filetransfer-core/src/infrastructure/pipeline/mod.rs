// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Server Pipeline (§4.F)
//!
//! A multi-stage chunk processing pipeline running on a fixed pool of OS
//! threads. Each stage has its own bounded queue; workers are not pinned
//! to a stage, so an idle worker can pick up whichever stage has a ready
//! job. Upload chunks flow `Decompress -> Decrypt -> Verify -> Write`;
//! download chunks flow `Read -> Encrypt -> Compress -> Send`.

mod context;
mod worker;

pub use context::{Job, PipelineCallbacks, PipelineContext, ReadSource, StageKind, WriteSink};
pub use worker::StageQueues;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam::channel::bounded;
use filetransfer_domain::services::{BandwidthLimiter, ChecksumService, CompressionService};
use filetransfer_domain::value_objects::{Chunk, TransferId};
use filetransfer_domain::TransferError;

use crate::infrastructure::stats::StatisticsCollector;

/// Queue depth and pool sizing for one [`ServerPipeline`] instance (§4.F).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub queue_size: usize,
    pub io_workers: usize,
    pub compression_workers: usize,
    pub network_workers: usize,
    pub encryption_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_size: 64,
            io_workers: 2,
            compression_workers: 2,
            network_workers: 2,
            encryption_workers: 1,
        }
    }
}

impl PipelineConfig {
    fn total_workers(&self) -> usize {
        (self.io_workers + self.compression_workers + self.network_workers + self.encryption_workers).max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Everything needed to construct a [`PipelineContext`], supplied by the
/// application layer at [`ServerPipeline::start`] time.
pub struct PipelineDependencies {
    pub compression_engines: Vec<Arc<dyn CompressionService>>,
    pub checksum: Arc<dyn ChecksumService>,
    pub stats: Arc<StatisticsCollector>,
    pub recv_limiter: Arc<dyn BandwidthLimiter>,
    pub send_limiter: Arc<dyn BandwidthLimiter>,
    pub callbacks: PipelineCallbacks,
    pub write_sink: Box<WriteSink>,
    pub read_source: Box<ReadSource>,
}

/// Owns the worker thread pool and per-stage queues for one running
/// server. `stopped -> starting -> running -> stopping -> stopped`; double
/// starts and stops are rejected rather than silently ignored (§4.F).
pub struct ServerPipeline {
    config: PipelineConfig,
    state: Mutex<PipelineState>,
    context: Mutex<Option<Arc<PipelineContext>>>,
    queues: Mutex<Option<Arc<StageQueues>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ServerPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            state: Mutex::new(PipelineState::Stopped),
            context: Mutex::new(None),
            queues: Mutex::new(None),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Builds the per-stage queues, spawns the worker pool, and transitions
    /// to `running`. Fails with [`TransferError::TransferInProgress`] if
    /// already started.
    pub fn start(&self, deps: PipelineDependencies) -> Result<(), TransferError> {
        {
            let mut state = self.state.lock().unwrap();
            if *state != PipelineState::Stopped {
                return Err(TransferError::TransferInProgress);
            }
            *state = PipelineState::Starting;
        }

        let running = Arc::new(AtomicBool::new(true));
        let context = Arc::new(PipelineContext {
            compression_engines: deps.compression_engines,
            checksum: deps.checksum,
            stats: deps.stats,
            running: running.clone(),
            recv_limiter: deps.recv_limiter,
            send_limiter: deps.send_limiter,
            callbacks: deps.callbacks,
            write_sink: deps.write_sink,
            read_source: deps.read_source,
            backpressure_events: AtomicU64::new(0),
            stall_detected: AtomicU64::new(0),
            chunks_processed: AtomicU64::new(0),
            bytes_processed: AtomicU64::new(0),
            compression_saved_bytes: AtomicU64::new(0),
        });

        let all_stages = StageKind::UPLOAD_STAGES.iter().chain(StageKind::DOWNLOAD_STAGES.iter()).copied();
        let mut senders = Vec::new();
        let mut receivers = Vec::new();
        for stage in all_stages {
            let (tx, rx) = bounded(self.config.queue_size);
            senders.push((stage, tx));
            receivers.push((stage, rx));
        }
        let queues = Arc::new(StageQueues { senders, receivers });

        let mut handles = Vec::with_capacity(self.config.total_workers());
        for _ in 0..self.config.total_workers() {
            let ctx = context.clone();
            let q = queues.clone();
            handles.push(std::thread::spawn(move || worker::run_worker(ctx, q)));
        }

        *self.context.lock().unwrap() = Some(context);
        *self.queues.lock().unwrap() = Some(queues);
        *self.workers.lock().unwrap() = handles;
        *self.state.lock().unwrap() = PipelineState::Running;
        Ok(())
    }

    /// Clears the running flag, optionally joins every worker thread, and
    /// transitions back to `stopped`. Fails with
    /// [`TransferError::ConfigInvalid`] if not currently running.
    pub fn stop(&self, wait: bool) -> Result<(), TransferError> {
        {
            let mut state = self.state.lock().unwrap();
            if *state != PipelineState::Running {
                return Err(TransferError::ConfigInvalid("pipeline is not running".to_string()));
            }
            *state = PipelineState::Stopping;
        }

        if let Some(context) = self.context.lock().unwrap().as_ref() {
            context.running.store(false, Ordering::SeqCst);
        }

        if wait {
            let handles = std::mem::take(&mut *self.workers.lock().unwrap());
            for handle in handles {
                let _ = handle.join();
            }
        }

        *self.context.lock().unwrap() = None;
        *self.queues.lock().unwrap() = None;
        *self.state.lock().unwrap() = PipelineState::Stopped;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        *self.state.lock().unwrap() == PipelineState::Running
    }

    /// Enqueues `chunk` onto the first upload stage, blocking briefly and
    /// counting a backpressure event if the queue is momentarily full.
    /// Fails with [`TransferError::ServerBusy`] if the pipeline isn't
    /// running or the queue stays full past the short local retry budget.
    ///
    /// The recv limiter is consumed here, on ingress to the upload
    /// pipeline, before the chunk is queued (§4.F).
    pub fn submit_upload_chunk(&self, transfer_id: TransferId, chunk: Chunk, cancellation: Arc<AtomicBool>) -> Result<(), TransferError> {
        let context = self.context.lock().unwrap().clone().ok_or(TransferError::ServerBusy)?;
        context.recv_limiter.acquire(chunk.wire_size());
        self.submit(transfer_id, chunk, StageKind::Decompress, cancellation, true)
    }

    /// Non-blocking variant: returns `false` immediately instead of
    /// retrying when the first stage's queue is full, or if the recv
    /// limiter has no tokens available right now.
    pub fn try_submit_upload_chunk(&self, transfer_id: TransferId, chunk: Chunk, cancellation: Arc<AtomicBool>) -> bool {
        let context = match self.context.lock().unwrap().clone() {
            Some(context) => context,
            None => return false,
        };
        if !context.recv_limiter.try_acquire(chunk.wire_size()) {
            return false;
        }
        self.submit(transfer_id, chunk, StageKind::Decompress, cancellation, false).is_ok()
    }

    /// Enqueues `chunk` onto the first download stage (`Read`); the
    /// `Read` stage fetches the chunk's bytes from storage via
    /// `context.read_source` using the header's offset and size, so
    /// callers only need to supply a header describing which bytes to
    /// send.
    pub fn submit_download_chunk(&self, transfer_id: TransferId, chunk: Chunk, cancellation: Arc<AtomicBool>) -> Result<(), TransferError> {
        self.submit(transfer_id, chunk, StageKind::Read, cancellation, true)
    }

    fn submit(
        &self,
        transfer_id: TransferId,
        chunk: Chunk,
        stage: StageKind,
        cancellation: Arc<AtomicBool>,
        retry: bool,
    ) -> Result<(), TransferError> {
        let queues = self.queues.lock().unwrap().clone().ok_or(TransferError::ServerBusy)?;
        let context = self.context.lock().unwrap().clone().ok_or(TransferError::ServerBusy)?;
        let worker_id = context.chunks_processed.load(Ordering::Relaxed) as usize;
        let sender = queues.sender_for(stage);
        let mut job = Job { transfer_id, chunk, stage, worker_id, cancellation };

        let attempts = if retry { 20 } else { 1 };
        for _ in 0..attempts {
            match sender.try_send(job) {
                Ok(()) => return Ok(()),
                Err(crossbeam::channel::TrySendError::Full(returned)) => {
                    context.backpressure_events.fetch_add(1, Ordering::Relaxed);
                    job = returned;
                    if retry {
                        std::thread::sleep(std::time::Duration::from_millis(1));
                    }
                }
                Err(crossbeam::channel::TrySendError::Disconnected(_)) => return Err(TransferError::ServerBusy),
            }
        }
        Err(TransferError::ServerBusy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetransfer_core_test_support::*;

    #[test]
    fn double_start_is_rejected() {
        let pipeline = ServerPipeline::new(PipelineConfig::default());
        pipeline.start(test_dependencies()).unwrap();
        assert_eq!(pipeline.start(test_dependencies()).unwrap_err(), TransferError::TransferInProgress);
        pipeline.stop(true).unwrap();
    }

    #[test]
    fn stop_without_start_is_rejected() {
        let pipeline = ServerPipeline::new(PipelineConfig::default());
        assert!(pipeline.stop(true).is_err());
    }

    #[test]
    fn submitted_chunk_reaches_write_sink() {
        use std::sync::atomic::AtomicBool;
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();
        let mut deps = test_dependencies();
        deps.write_sink = Box::new(move |_id, _offset, data| {
            tx.send(data.to_vec()).unwrap();
            Ok(())
        });

        let pipeline = ServerPipeline::new(PipelineConfig::default());
        pipeline.start(deps).unwrap();

        let transfer_id = TransferId::generate();
        let chunk = plain_chunk(transfer_id, b"hello world");
        pipeline.submit_upload_chunk(transfer_id, chunk, Arc::new(AtomicBool::new(false))).unwrap();

        let received = rx.recv_timeout(std::time::Duration::from_secs(2)).expect("chunk never reached write stage");
        assert_eq!(received, b"hello world");
        pipeline.stop(true).unwrap();
    }

    #[test]
    fn download_chunk_is_populated_from_read_source() {
        use std::sync::atomic::AtomicBool;
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();
        let mut deps = test_dependencies();
        deps.read_source = Box::new(|_id, _offset, _len| Ok(b"from storage".to_vec()));
        deps.callbacks.download_ready = Box::new(move |chunk| {
            tx.send(chunk.payload).unwrap();
        });

        let pipeline = ServerPipeline::new(PipelineConfig::default());
        pipeline.start(deps).unwrap();

        let transfer_id = TransferId::generate();
        let chunk = plain_chunk(transfer_id, b"placeholder only, overwritten by read_source");
        pipeline.submit_download_chunk(transfer_id, chunk, Arc::new(AtomicBool::new(false))).unwrap();

        let received = rx.recv_timeout(std::time::Duration::from_secs(2)).expect("chunk never reached send stage");
        assert_eq!(received, b"from storage");
        pipeline.stop(true).unwrap();
    }

    #[test]
    fn recv_limiter_is_consumed_on_upload_ingress() {
        use std::sync::atomic::AtomicBool;

        let mut deps = test_dependencies();
        deps.recv_limiter = Arc::new(crate::infrastructure::bandwidth::TokenBucketLimiter::new(0));
        deps.recv_limiter.set_limit(1);
        deps.recv_limiter.enable();

        let pipeline = ServerPipeline::new(PipelineConfig::default());
        pipeline.start(deps).unwrap();

        let transfer_id = TransferId::generate();
        let chunk = plain_chunk(transfer_id, b"hello world");
        assert!(!pipeline.try_submit_upload_chunk(transfer_id, chunk, Arc::new(AtomicBool::new(false))));
        pipeline.stop(true).unwrap();
    }
}

/// Test-only fixtures shared by this module's unit tests, kept inline
/// rather than in a separate crate so they stay next to what they support.
#[cfg(test)]
mod filetransfer_core_test_support {
    use super::*;
    use filetransfer_domain::value_objects::chunk_header::ChunkHeader;
    use filetransfer_domain::value_objects::Chunk;

    pub fn test_dependencies() -> PipelineDependencies {
        PipelineDependencies {
            compression_engines: vec![Arc::new(crate::infrastructure::adapters::AdaptiveLz4Compression::new())],
            checksum: Arc::new(crate::infrastructure::adapters::Crc32Sha256Checksum::new()),
            stats: Arc::new(StatisticsCollector::new()),
            recv_limiter: Arc::new(crate::infrastructure::bandwidth::TokenBucketLimiter::new(0)),
            send_limiter: Arc::new(crate::infrastructure::bandwidth::TokenBucketLimiter::new(0)),
            callbacks: PipelineCallbacks::default(),
            write_sink: Box::new(|_, _, _| Ok(())),
            read_source: Box::new(|_, _, _| Ok(Vec::new())),
        }
    }

    pub fn plain_chunk(transfer_id: TransferId, payload: &[u8]) -> Chunk {
        let checksum = crc32fast::hash(payload);
        let header = ChunkHeader {
            transfer_id,
            chunk_index: 0,
            chunk_offset: 0,
            original_size: payload.len() as u32,
            compressed_size: payload.len() as u32,
            checksum,
            flags: 0,
        };
        Chunk::new(header, payload.to_vec())
    }
}
