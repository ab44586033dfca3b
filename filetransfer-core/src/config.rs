// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Layered Configuration
//!
//! Defaults, overlaid by an optional `--config` file (TOML or YAML,
//! chosen by extension), overlaid by `FILETRANSFER_*` environment
//! variables, via the `config` crate. Mirrors the CLI's own
//! parse-then-validate split: [`AppConfig`] is the validated shape the
//! rest of the crate consumes.

use std::path::Path;

use once_cell::sync::OnceCell;
use serde::Deserialize;

/// Process-wide configuration, loaded once at startup and read from
/// everywhere a command needs it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory the server pipeline and quota manager treat as the
    /// root of managed storage.
    pub storage_path: String,
    /// Total bytes permitted under `storage_path`; `0` means unlimited (§3).
    pub quota_bytes: u64,
    pub pipeline: PipelineSection,
    /// Default bandwidth ceiling applied to new transfers, in Mbps;
    /// `None` leaves the limiter disabled.
    pub bandwidth_limit_mbps: Option<u32>,
    pub s3_region: Option<String>,
    pub s3_bucket: Option<String>,
    pub azure_container: Option<String>,
    pub gcs_bucket: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub queue_size: usize,
    pub io_workers: usize,
    pub compression_workers: usize,
    pub network_workers: usize,
    pub encryption_workers: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self { queue_size: 64, io_workers: 2, compression_workers: 2, network_workers: 2, encryption_workers: 1 }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_path: "./data".to_string(),
            quota_bytes: 0,
            pipeline: PipelineSection::default(),
            bandwidth_limit_mbps: None,
            s3_region: None,
            s3_bucket: None,
            azure_container: None,
            gcs_bucket: None,
        }
    }
}

impl From<PipelineSection> for crate::infrastructure::pipeline::PipelineConfig {
    fn from(section: PipelineSection) -> Self {
        Self {
            queue_size: section.queue_size,
            io_workers: section.io_workers,
            compression_workers: section.compression_workers,
            network_workers: section.network_workers,
            encryption_workers: section.encryption_workers,
        }
    }
}

static LOADED: OnceCell<AppConfig> = OnceCell::new();

/// Loads configuration from defaults, then `path` (if given), then
/// `FILETRANSFER_*` environment variables, and caches the result for the
/// lifetime of the process.
pub fn load(path: Option<&Path>) -> anyhow::Result<&'static AppConfig> {
    if let Some(cached) = LOADED.get() {
        return Ok(cached);
    }

    let defaults = AppConfig::default();
    let mut builder = config::Config::builder()
        .set_default("storage_path", defaults.storage_path.clone())?
        .set_default("quota_bytes", defaults.quota_bytes)?
        .set_default("pipeline.queue_size", defaults.pipeline.queue_size as i64)?
        .set_default("pipeline.io_workers", defaults.pipeline.io_workers as i64)?
        .set_default("pipeline.compression_workers", defaults.pipeline.compression_workers as i64)?
        .set_default("pipeline.network_workers", defaults.pipeline.network_workers as i64)?
        .set_default("pipeline.encryption_workers", defaults.pipeline.encryption_workers as i64)?;

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }
    builder = builder.add_source(config::Environment::with_prefix("FILETRANSFER").separator("__"));

    let settings = builder.build()?;
    let parsed: AppConfig = settings.try_deserialize()?;
    Ok(LOADED.get_or_init(|| parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.quota_bytes, 0);
        assert_eq!(config.pipeline.io_workers, 2);
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filetransfer.yaml");
        std::fs::write(&path, "storage_path: /srv/transfers\nquota_bytes: 1000\n").unwrap();

        let settings = config::Config::builder()
            .set_default("storage_path", "./data")
            .unwrap()
            .set_default("quota_bytes", 0i64)
            .unwrap()
            .set_default("pipeline.queue_size", 64i64)
            .unwrap()
            .set_default("pipeline.io_workers", 2i64)
            .unwrap()
            .set_default("pipeline.compression_workers", 2i64)
            .unwrap()
            .set_default("pipeline.network_workers", 2i64)
            .unwrap()
            .set_default("pipeline.encryption_workers", 1i64)
            .unwrap()
            .add_source(config::File::from(path.as_path()))
            .build()
            .unwrap();
        let parsed: AppConfig = settings.try_deserialize().unwrap();

        assert_eq!(parsed.storage_path, "/srv/transfers");
        assert_eq!(parsed.quota_bytes, 1000);
    }
}
