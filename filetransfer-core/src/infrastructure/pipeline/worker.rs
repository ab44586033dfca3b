// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Worker Loop
//!
//! One function run by every thread in the pool. Workers pull whichever
//! stage queue has a ready job (`crossbeam_channel::Select`) rather than
//! owning a dedicated stage, so idle capacity from one stage can pick up
//! slack from another (§4.F "work-stealing across stages is permitted").

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{Receiver, Select, Sender};
use filetransfer_domain::value_objects::chunk_header::flags;
use filetransfer_domain::value_objects::Chunk;

use super::context::{Job, PipelineContext, StageKind};

const STALL_RETRY_YIELD: Duration = Duration::from_millis(1);
const STALL_RETRY_ATTEMPTS: u32 = 20;

pub struct StageQueues {
    pub senders: Vec<(StageKind, Sender<Job>)>,
    pub receivers: Vec<(StageKind, Receiver<Job>)>,
}

impl StageQueues {
    pub fn sender_for(&self, stage: StageKind) -> &Sender<Job> {
        self.senders.iter().find(|(s, _)| *s == stage).map(|(_, tx)| tx).expect("stage queue must exist")
    }
}

/// Runs on each pool thread until the context's `running` flag clears and
/// every stage queue has drained.
pub fn run_worker(context: Arc<PipelineContext>, queues: Arc<StageQueues>) {
    loop {
        let mut select = Select::new();
        for (_, rx) in &queues.receivers {
            select.recv(rx);
        }

        let oper = match select.try_select() {
            Ok(oper) => oper,
            Err(_) => {
                if !context.is_running() && queues.receivers.iter().all(|(_, rx)| rx.is_empty()) {
                    return;
                }
                std::thread::sleep(STALL_RETRY_YIELD);
                continue;
            }
        };

        let index = oper.index();
        let (stage, rx) = &queues.receivers[index];
        let job = match oper.recv(rx) {
            Ok(job) => job,
            Err(_) => continue,
        };
        debug_assert_eq!(*stage, job.stage);

        process_job(&context, &queues, job);
    }
}

fn process_job(context: &Arc<PipelineContext>, queues: &Arc<StageQueues>, job: Job) {
    if job.cancellation.load(Ordering::SeqCst) {
        return;
    }

    let Job { transfer_id, mut chunk, stage, worker_id, cancellation } = job;

    let result = match stage {
        StageKind::Decompress => decompress(context, worker_id, &mut chunk),
        StageKind::Decrypt => Ok(()), // encryption key management is out of scope (§9)
        StageKind::Verify => verify(context, &chunk),
        StageKind::Write => {
            let outcome = write(context, transfer_id, &chunk);
            if outcome.is_ok() {
                context.record_final_stage(chunk.header.original_size as u64);
            }
            outcome
        }
        StageKind::Read => read(context, transfer_id, &mut chunk),
        StageKind::Encrypt => Ok(()),
        StageKind::Compress => compress(context, worker_id, &mut chunk),
        StageKind::Send => {
            context.send_limiter.acquire(chunk.wire_size());
            context.record_final_stage(chunk.header.original_size as u64);
            (context.callbacks.download_ready)(chunk.clone());
            Ok(())
        }
    };

    match result {
        Ok(()) => {
            (context.callbacks.stage_complete)(stage, &chunk);
            if let Some(next_stage) = stage.next() {
                enqueue_next(context, queues, transfer_id, chunk, next_stage, worker_id, cancellation);
            }
        }
        Err(message) => {
            (context.callbacks.error)(stage, &message);
        }
    }
}

fn enqueue_next(
    context: &Arc<PipelineContext>,
    queues: &Arc<StageQueues>,
    transfer_id: filetransfer_domain::value_objects::TransferId,
    chunk: Chunk,
    next_stage: StageKind,
    worker_id: usize,
    cancellation: Arc<std::sync::atomic::AtomicBool>,
) {
    let sender = queues.sender_for(next_stage);
    let mut job = Job { transfer_id, chunk, stage: next_stage, worker_id, cancellation };

    for _ in 0..STALL_RETRY_ATTEMPTS {
        if cancellation.load(Ordering::SeqCst) || !context.is_running() {
            return;
        }
        match sender.try_send(job) {
            Ok(()) => return,
            Err(crossbeam::channel::TrySendError::Full(returned)) => {
                context.stall_detected.fetch_add(1, Ordering::Relaxed);
                job = returned;
                std::thread::sleep(STALL_RETRY_YIELD);
            }
            Err(crossbeam::channel::TrySendError::Disconnected(_)) => return,
        }
    }
    // Queue has been persistently full; fall back to a cancellation-aware
    // blocking send rather than dropping the chunk (§4.F "implementations
    // may also block briefly with a cancellation-aware wait").
    let _ = sender.send(job);
}

fn decompress(context: &PipelineContext, worker_id: usize, chunk: &mut Chunk) -> Result<(), String> {
    if !chunk.header.is_compressed() {
        return Ok(());
    }
    let engine = &context.compression_engines[worker_id % context.compression_engines.len()];
    let original = engine
        .decompress(&chunk.payload, chunk.header.original_size as usize)
        .map_err(|e| e.to_string())?;
    chunk.payload = original;
    chunk.header.compressed_size = chunk.header.original_size;
    chunk.header.flags &= !flags::COMPRESSED;
    Ok(())
}

fn verify(context: &PipelineContext, chunk: &Chunk) -> Result<(), String> {
    if !context.checksum.verify_crc32(&chunk.payload, chunk.header.checksum) {
        return Err(format!("checksum mismatch for chunk {}", chunk.header.chunk_index));
    }
    Ok(())
}

fn write(context: &PipelineContext, transfer_id: filetransfer_domain::value_objects::TransferId, chunk: &Chunk) -> Result<(), String> {
    (context.write_sink)(transfer_id, chunk.header.chunk_offset, &chunk.payload).map_err(|e| e.to_string())
}

/// Fetches this chunk's bytes from storage via `context.read_source`,
/// populating `chunk.payload` (§4.F download path: `Read` is the stage
/// that actually touches the backing file or object store).
fn read(context: &PipelineContext, transfer_id: filetransfer_domain::value_objects::TransferId, chunk: &mut Chunk) -> Result<(), String> {
    let bytes = (context.read_source)(transfer_id, chunk.header.chunk_offset, chunk.header.original_size).map_err(|e| e.to_string())?;
    chunk.header.compressed_size = bytes.len() as u32;
    chunk.payload = bytes;
    Ok(())
}

fn compress(context: &PipelineContext, worker_id: usize, chunk: &mut Chunk) -> Result<(), String> {
    let engine = &context.compression_engines[worker_id % context.compression_engines.len()];
    let should_compress = engine.should_compress(&chunk.payload).map_err(|e| e.to_string())?;
    if !should_compress {
        chunk.header.compressed_size = chunk.header.original_size;
        return Ok(());
    }
    let compressed = engine.compress(&chunk.payload).map_err(|e| e.to_string())?;
    context.record_compression_saving(chunk.header.original_size, compressed.len() as u32);
    chunk.header.compressed_size = compressed.len() as u32;
    chunk.header.flags |= flags::COMPRESSED;
    chunk.payload = compressed;
    Ok(())
}
