// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # `filetransfer` CLI
//!
//! Composition root: parses and validates arguments via
//! `filetransfer-bootstrap`, loads layered configuration, wires the
//! concrete `Logger`/`Monitor` adapters, and dispatches to one of the
//! five subcommands. `serve` runs the chunked-transfer protocol server
//! over the local filesystem; `upload`/`download`/`presign` talk
//! directly to a cloud object store; `quota-report` inspects a managed
//! directory's usage.

use std::fs;
use std::io::{Read as _, Write as _};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use filetransfer_bootstrap::{bootstrap_cli, PrometheusMonitor, RayonScheduler, TracingLogger, ValidatedCommand};
use filetransfer_domain::repositories::{CloudStore, PresignedMethod, PresignedUrlOptions, UploadOptions};
use filetransfer_domain::services::ports::{Logger, Monitor};

use filetransfer_core::config::{self, AppConfig};
use filetransfer_core::infrastructure::cloud::signing::{AwsCredentials, AzureCredentials, GcsCredentials};
use filetransfer_core::infrastructure::cloud::{AzureStore, GcsStore, S3Store};
use filetransfer_core::infrastructure::quota::QuotaManager;

mod serve;

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "filetransfer=info",
        1 => "filetransfer=debug",
        _ => "filetransfer=trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_cloud_store(provider: &str, cfg: &AppConfig) -> Result<Box<dyn CloudStore>> {
    match provider {
        "s3" => {
            let credentials = AwsCredentials {
                access_key: std::env::var("AWS_ACCESS_KEY_ID").context("AWS_ACCESS_KEY_ID is required for --cloud-provider s3")?,
                secret_key: std::env::var("AWS_SECRET_ACCESS_KEY").context("AWS_SECRET_ACCESS_KEY is required for --cloud-provider s3")?,
            };
            let region = cfg.s3_region.clone().or_else(|| std::env::var("AWS_REGION").ok()).unwrap_or_else(|| "us-east-1".to_string());
            let bucket = cfg.s3_bucket.clone().context("s3_bucket must be set in configuration")?;
            Ok(Box::new(S3Store::new(credentials, region, bucket)?))
        }
        "azure" => {
            let credentials = AzureCredentials {
                account: std::env::var("AZURE_STORAGE_ACCOUNT").context("AZURE_STORAGE_ACCOUNT is required for --cloud-provider azure")?,
                account_key: std::env::var("AZURE_STORAGE_ACCESS_KEY").context("AZURE_STORAGE_ACCESS_KEY is required for --cloud-provider azure")?,
            };
            let container = cfg.azure_container.clone().context("azure_container must be set in configuration")?;
            Ok(Box::new(AzureStore::new(credentials, container)?))
        }
        "gcs" => {
            let key_path = std::env::var("GCS_PRIVATE_KEY_PATH").context("GCS_PRIVATE_KEY_PATH is required for --cloud-provider gcs")?;
            let credentials = GcsCredentials {
                client_email: std::env::var("GCS_CLIENT_EMAIL").context("GCS_CLIENT_EMAIL is required for --cloud-provider gcs")?,
                private_key_pkcs8: fs::read(&key_path).with_context(|| format!("reading GCS private key at {key_path}"))?,
            };
            let bucket = cfg.gcs_bucket.clone().context("gcs_bucket must be set in configuration")?;
            Ok(Box::new(GcsStore::new(credentials, bucket)?))
        }
        other => bail!("unsupported cloud provider '{other}'"),
    }
}

fn run_upload(
    file: PathBuf,
    remote_path: String,
    chunk_size_bytes: u64,
    bandwidth_limit_mbps: Option<u32>,
    cloud_provider: Option<String>,
    cfg: &AppConfig,
    logger: &TracingLogger,
) -> Result<()> {
    let provider = cloud_provider.context("--cloud-provider is required for upload")?;
    let store = build_cloud_store(&provider, cfg)?;
    store.connect()?;

    let limiter = filetransfer_core::infrastructure::bandwidth::TokenBucketLimiter::new(0);
    if let Some(mbps) = bandwidth_limit_mbps {
        limiter.set_limit((mbps as usize) * 1024 * 1024 / 8);
        limiter.enable();
    }

    let mut input = fs::File::open(&file).with_context(|| format!("opening {}", file.display()))?;
    let mut stream = store.create_upload_stream(&remote_path, &UploadOptions::default())?;
    let mut buffer = vec![0u8; chunk_size_bytes.max(1) as usize];
    loop {
        let n = input.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        limiter.acquire(n);
        stream.write(&buffer[..n])?;
    }
    let metadata = stream.finalize()?;
    logger.info(&format!("uploaded {} ({} bytes) to {provider}", metadata.key, metadata.size));
    Ok(())
}

fn run_download(remote_path: String, destination: PathBuf, resume: bool, cloud_provider: Option<String>, cfg: &AppConfig, logger: &TracingLogger) -> Result<()> {
    if resume {
        warn!("--resume has no effect on direct cloud downloads; it only applies to chunked-protocol transfers");
    }
    let provider = cloud_provider.context("--cloud-provider is required for download")?;
    let store = build_cloud_store(&provider, cfg)?;
    store.connect()?;

    let mut stream = store.create_download_stream(&remote_path)?;
    let mut output = fs::File::create(&destination).with_context(|| format!("creating {}", destination.display()))?;
    let mut buffer = vec![0u8; 4 * 1024 * 1024];
    while stream.has_more() {
        let n = stream.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        output.write_all(&buffer[..n])?;
    }
    logger.info(&format!("downloaded {remote_path} ({} bytes) from {provider}", stream.bytes_read()));
    Ok(())
}

fn run_presign(key: String, cloud_provider: String, expiration_secs: u64, cfg: &AppConfig) -> Result<()> {
    let store = build_cloud_store(&cloud_provider, cfg)?;
    let url = store.generate_presigned_url(
        &key,
        &PresignedUrlOptions { method: PresignedMethod::Get, expiration_secs, content_type: None, content_md5: None },
    )?;
    println!("{url}");
    Ok(())
}

fn run_quota_report(directory: PathBuf, monitor: &PrometheusMonitor) -> Result<()> {
    let quota = QuotaManager::new(directory.clone(), 0);
    quota.refresh_usage()?;
    let usage = quota.usage();
    monitor.record_gauge("quota_used_bytes", usage.used_bytes as f64);
    println!("{}: {} bytes used across {} files", directory.display(), usage.used_bytes, usage.file_count);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = bootstrap_cli().map_err(|e| anyhow::anyhow!(e))?;
    init_tracing(cli.verbose);

    let cfg = config::load(cli.config.as_deref())?;
    let logger = TracingLogger::default();
    let monitor = PrometheusMonitor::new();

    match cli.command {
        ValidatedCommand::Serve { listen, workers } => {
            let scheduler = RayonScheduler::new(workers as usize).context("building worker pool")?;
            info!("starting filetransfer server on {listen} with {workers} workers");
            serve::run(&listen, cfg, Arc::new(scheduler), &logger, &monitor).await?;
        }
        ValidatedCommand::Upload { file, remote_path, chunk_size_bytes, bandwidth_limit_mbps, cloud_provider } => {
            run_upload(file, remote_path, chunk_size_bytes, bandwidth_limit_mbps, cloud_provider, cfg, &logger)?;
        }
        ValidatedCommand::Download { remote_path, destination, resume, cloud_provider } => {
            run_download(remote_path, destination, resume, cloud_provider, cfg, &logger)?;
        }
        ValidatedCommand::Presign { key, cloud_provider, expiration_secs } => {
            run_presign(key, cloud_provider, expiration_secs, cfg)?;
        }
        ValidatedCommand::QuotaReport { directory } => {
            run_quota_report(directory, &monitor)?;
        }
    }

    Ok(())
}
