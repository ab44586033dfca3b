// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Parsing and Validation
//!
//! Two-phase argument handling: `clap` parses the shape, then
//! [`validate`] re-checks anything that could be abused if passed
//! straight through to the filesystem or network layer (path
//! traversal, absurd numeric ranges). Callers get a [`ValidatedCli`]
//! they can trust without re-checking.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("path '{0}' escapes its parent via '..'")]
    PathTraversal(String),
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange { field: &'static str, value: i64, min: i64, max: i64 },
    #[error("unsupported cloud provider '{0}' (expected s3, azure, or gcs)")]
    UnknownProvider(String),
    #[error("'{0}' is empty")]
    Empty(&'static str),
}

#[derive(Debug, Parser)]
#[command(name = "filetransfer", version, about = "Chunked file transfer client and server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a layered configuration file (defaults -> file -> env).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity; repeatable.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the chunked-transfer server, accepting uploads and downloads.
    Serve {
        #[arg(long, default_value = "0.0.0.0:9443")]
        listen: String,
        #[arg(long, default_value_t = 8)]
        workers: u32,
    },
    /// Upload a local file to the server or directly to cloud storage.
    Upload {
        file: PathBuf,
        #[arg(long)]
        remote_path: String,
        #[arg(long, default_value_t = 4 * 1024 * 1024)]
        chunk_size_bytes: u64,
        #[arg(long)]
        bandwidth_limit_mbps: Option<u32>,
        #[arg(long)]
        cloud_provider: Option<String>,
    },
    /// Download a remote file to a local path.
    Download {
        remote_path: String,
        destination: PathBuf,
        #[arg(long)]
        resume: bool,
        #[arg(long)]
        cloud_provider: Option<String>,
    },
    /// Generate a presigned URL for a cloud object.
    Presign {
        key: String,
        #[arg(long)]
        cloud_provider: String,
        #[arg(long, default_value_t = 3600)]
        expiration_secs: u64,
    },
    /// Print the current quota usage for a managed directory.
    QuotaReport {
        directory: PathBuf,
    },
}

/// A [`Cli`] whose arguments have passed [`validate`].
#[derive(Debug)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub config: Option<PathBuf>,
    pub verbose: u8,
}

#[derive(Debug)]
pub enum ValidatedCommand {
    Serve { listen: String, workers: u32 },
    Upload { file: PathBuf, remote_path: String, chunk_size_bytes: u64, bandwidth_limit_mbps: Option<u32>, cloud_provider: Option<String> },
    Download { remote_path: String, destination: PathBuf, resume: bool, cloud_provider: Option<String> },
    Presign { key: String, cloud_provider: String, expiration_secs: u64 },
    QuotaReport { directory: PathBuf },
}

const MIN_WORKERS: i64 = 1;
const MAX_WORKERS: i64 = 128;
const MIN_CHUNK_SIZE: i64 = 1024;
const MAX_CHUNK_SIZE: i64 = 64 * 1024 * 1024;
const MIN_EXPIRATION_SECS: i64 = 1;
const MAX_EXPIRATION_SECS: i64 = 7 * 24 * 3600;

fn validate_no_traversal(path: &str) -> Result<(), ValidationError> {
    if Path::new(path).components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return Err(ValidationError::PathTraversal(path.to_string()));
    }
    Ok(())
}

fn validate_provider(provider: &str) -> Result<(), ValidationError> {
    match provider {
        "s3" | "azure" | "gcs" => Ok(()),
        other => Err(ValidationError::UnknownProvider(other.to_string())),
    }
}

fn validate_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange { field, value, min, max });
    }
    Ok(())
}

/// Parses `argv` and validates the result in one step.
pub fn parse_and_validate_from<I, T>(args: I) -> Result<ValidatedCli, ValidationError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    validate(cli)
}

/// Parses `std::env::args()` and validates the result.
pub fn bootstrap_cli() -> Result<ValidatedCli, ValidationError> {
    let cli = Cli::parse();
    validate(cli)
}

fn validate(cli: Cli) -> Result<ValidatedCli, ValidationError> {
    let command = match cli.command {
        Command::Serve { listen, workers } => {
            if listen.trim().is_empty() {
                return Err(ValidationError::Empty("listen"));
            }
            validate_range("workers", workers as i64, MIN_WORKERS, MAX_WORKERS)?;
            ValidatedCommand::Serve { listen, workers }
        }
        Command::Upload { file, remote_path, chunk_size_bytes, bandwidth_limit_mbps, cloud_provider } => {
            validate_no_traversal(&remote_path)?;
            validate_range("chunk_size_bytes", chunk_size_bytes as i64, MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)?;
            if let Some(provider) = &cloud_provider {
                validate_provider(provider)?;
            }
            ValidatedCommand::Upload { file, remote_path, chunk_size_bytes, bandwidth_limit_mbps, cloud_provider }
        }
        Command::Download { remote_path, destination, resume, cloud_provider } => {
            validate_no_traversal(&remote_path)?;
            if let Some(provider) = &cloud_provider {
                validate_provider(provider)?;
            }
            ValidatedCommand::Download { remote_path, destination, resume, cloud_provider }
        }
        Command::Presign { key, cloud_provider, expiration_secs } => {
            validate_no_traversal(&key)?;
            validate_provider(&cloud_provider)?;
            validate_range("expiration_secs", expiration_secs as i64, MIN_EXPIRATION_SECS, MAX_EXPIRATION_SECS)?;
            ValidatedCommand::Presign { key, cloud_provider, expiration_secs }
        }
        Command::QuotaReport { directory } => ValidatedCommand::QuotaReport { directory },
    };

    Ok(ValidatedCli { command, config: cli.config, verbose: cli.verbose })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<ValidatedCli, ValidationError> {
        let mut full = vec!["filetransfer"];
        full.extend_from_slice(args);
        parse_and_validate_from(full)
    }

    #[test]
    fn accepts_valid_upload() {
        let result = parse(&["upload", "local.bin", "--remote-path", "backups/local.bin"]);
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_remote_path_traversal() {
        let result = parse(&["upload", "local.bin", "--remote-path", "../../etc/passwd"]);
        assert!(matches!(result, Err(ValidationError::PathTraversal(_))));
    }

    #[test]
    fn rejects_unknown_cloud_provider() {
        let result = parse(&["upload", "local.bin", "--remote-path", "x", "--cloud-provider", "dropbox"]);
        assert!(matches!(result, Err(ValidationError::UnknownProvider(_))));
    }

    #[test]
    fn rejects_worker_count_out_of_range() {
        let result = parse(&["serve", "--workers", "0"]);
        assert!(matches!(result, Err(ValidationError::OutOfRange { field: "workers", .. })));
    }

    #[test]
    fn rejects_chunk_size_out_of_range() {
        let result = parse(&["upload", "local.bin", "--remote-path", "x", "--chunk-size-bytes", "16"]);
        assert!(matches!(result, Err(ValidationError::OutOfRange { field: "chunk_size_bytes", .. })));
    }

    #[test]
    fn accepts_valid_presign() {
        let result = parse(&["presign", "key.bin", "--cloud-provider", "s3"]);
        assert!(result.is_ok());
    }
}
