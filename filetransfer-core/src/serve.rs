// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Server Accept Loop
//!
//! Binds the listen address, and for each incoming TCP connection spawns
//! a blocking task running [`ServerSession::handle_one`] over the
//! filesystem rooted at the configured `storage_path`. Ctrl-C triggers a
//! [`ShutdownCoordinator`]-bounded drain: in-flight connections get the
//! configured grace period to finish before the process exits.

use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing::{error, info};

use filetransfer_bootstrap::{RayonScheduler, ShutdownCoordinator, TracingLogger, DEFAULT_GRACE_PERIOD_SECS};
use filetransfer_domain::errors::TransferError;
use filetransfer_domain::services::ports::{Logger, Monitor, Task, ThreadPoolScheduler};
use filetransfer_domain::value_objects::TransferId;

use crate::config::AppConfig;
use crate::infrastructure::adapters::Crc32Sha256Checksum;
use crate::infrastructure::quota::QuotaManager;
use crate::infrastructure::protocol::{ServerSession, ServerSessionHandlers};

/// Default chunk size used to compute `total_chunks` for a download when
/// the client does not negotiate one (§4.F's default queue chunking).
const DEFAULT_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

fn build_handlers(storage_root: PathBuf, quota: Arc<QuotaManager>) -> ServerSessionHandlers {
    let active_upload = Arc::new(Mutex::new(None::<PathBuf>));
    let active_download = Arc::new(Mutex::new(None::<PathBuf>));

    let upload_root = storage_root.clone();
    let upload_slot = active_upload.clone();
    let upload_quota = quota.clone();
    let accept_upload = Box::new(move |filename: &str, file_size: u64| {
        upload_quota.check_quota(file_size).map_err(|e| e.to_string())?;
        *upload_slot.lock().unwrap() = Some(upload_root.join(filename));
        Ok(None)
    });

    let download_root = storage_root.clone();
    let download_slot = active_download.clone();
    let accept_download = Box::new(move |filename: &str| {
        let path = download_root.join(filename);
        let metadata = fs::metadata(&path).map_err(|e| e.to_string())?;
        let mut file = fs::File::open(&path).map_err(|e| e.to_string())?;
        let checksum = Crc32Sha256Checksum::new();
        let mut hasher = {
            use filetransfer_domain::services::ChecksumService;
            checksum.sha256_stream()
        };
        let mut buffer = [0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buffer).map_err(|e| e.to_string())?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        let sha256_hash = hasher.finalize_hex();
        let total_chunks = metadata.len().div_ceil(DEFAULT_CHUNK_SIZE).max(1);
        *download_slot.lock().unwrap() = Some(path);
        Ok((metadata.len(), total_chunks, sha256_hash))
    });

    let resume_root = storage_root.clone();
    let accept_resume = Box::new(move |filename: &str, _file_hash: &str, _file_size: u64| {
        let path = resume_root.join(filename);
        match fs::metadata(&path) {
            Ok(metadata) => Ok(metadata.len() / DEFAULT_CHUNK_SIZE),
            Err(_) => Ok(0),
        }
    });

    let write_slot = active_upload.clone();
    let write_chunk = Box::new(move |_transfer_id: TransferId, offset: u64, bytes: &[u8]| -> Result<(), TransferError> {
        let path = write_slot.lock().unwrap().clone().ok_or_else(|| TransferError::ConfigInvalid("no active upload on this connection".to_string()))?;
        let mut file = OpenOptions::new().create(true).write(true).open(&path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        Ok(())
    });

    let read_slot = active_download.clone();
    let read_chunk = Box::new(move |_transfer_id: TransferId, offset: u64, len: u32| -> Result<Vec<u8>, TransferError> {
        let path = read_slot.lock().unwrap().clone().ok_or_else(|| TransferError::ConfigInvalid("no active download on this connection".to_string()))?;
        let mut file = fs::File::open(&path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; len as usize];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    });

    ServerSessionHandlers { accept_upload, accept_download, accept_resume, write_chunk, read_chunk }
}

fn handle_connection(stream: TcpStream, storage_root: PathBuf, quota: Arc<QuotaManager>) {
    let checksum = Arc::new(Crc32Sha256Checksum::new());
    let handlers = build_handlers(storage_root, quota);
    let mut session = ServerSession::new(stream, checksum, handlers);
    if let Err(e) = session.handle_one() {
        error!("connection ended with error: {e}");
    }
}

pub async fn run(listen: &str, cfg: &AppConfig, scheduler: Arc<RayonScheduler>, logger: &TracingLogger, monitor: &(impl Monitor + ?Sized)) -> Result<()> {
    let storage_root = PathBuf::from(&cfg.storage_path);
    fs::create_dir_all(&storage_root)?;
    let quota = Arc::new(QuotaManager::new(storage_root.clone(), cfg.quota_bytes));
    quota.refresh_usage()?;
    monitor.record_gauge("quota_used_bytes", quota.usage().used_bytes as f64);

    let coordinator = Arc::new(ShutdownCoordinator::new(std::time::Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS)));
    let token = coordinator.token();

    let listener = tokio::net::TcpListener::bind(listen).await?;
    logger.info(&format!("listening on {listen}"));

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                info!("accepted connection from {peer}");
                let std_stream = stream.into_std()?;
                std_stream.set_nonblocking(false)?;
                let root = storage_root.clone();
                let quota = quota.clone();
                let task: Task = Box::new(move || handle_connection(std_stream, root, quota));
                scheduler.submit(task);
            }
            _ = tokio::signal::ctrl_c() => {
                logger.info("received shutdown signal, draining in-flight connections");
                break;
            }
        }
    }

    coordinator.initiate_shutdown();
    let _ = token;
    coordinator.wait_with_timeout(std::time::Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS)).await;
    Ok(())
}
