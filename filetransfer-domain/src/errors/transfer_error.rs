// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Core transfer error codes, banded `-700` to `-799`.
//!
//! Band layout:
//! - `-700..-709` Connection
//! - `-710..-719` Transfer
//! - `-720..-739` Chunk
//! - `-740..-749` Storage
//! - `-750..-759` File I/O
//! - `-760..-779` Resume
//! - `-780..-789` Compression
//! - `-790..-799` Configuration

use thiserror::Error;

/// Domain-specific errors for chunked file transfer.
///
/// Each variant carries a stable numeric wire code (see [`TransferError::code`])
/// matching the ecosystem convention the protocol was distilled from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    // Connection errors (-700..-709)
    #[error("connection failed")]
    ConnectionFailed,
    #[error("connection timeout")]
    ConnectionTimeout,
    #[error("connection refused")]
    ConnectionRefused,
    #[error("connection lost")]
    ConnectionLost,
    #[error("reconnect failed after max attempts")]
    ReconnectFailed,
    #[error("session expired")]
    SessionExpired,
    #[error("server at maximum connections")]
    ServerBusy,
    #[error("protocol version incompatible")]
    ProtocolMismatch,

    // Transfer errors (-710..-719)
    #[error("transfer initialization failed: {0}")]
    TransferInitFailed(String),
    #[error("transfer cancelled by user")]
    TransferCancelled,
    #[error("transfer timeout")]
    TransferTimeout,
    #[error("upload rejected by server: {0}")]
    UploadRejected(String),
    #[error("download rejected by server: {0}")]
    DownloadRejected(String),
    #[error("transfer ID already in use")]
    TransferAlreadyExists,
    #[error("transfer ID not found")]
    TransferNotFound,
    #[error("transfer already in progress")]
    TransferInProgress,

    // Chunk errors (-720..-739)
    #[error("chunk CRC32 verification failed for chunk {0}")]
    ChunkChecksumError(u64),
    #[error("chunk sequence error")]
    ChunkSequenceError,
    #[error("chunk size exceeds maximum")]
    ChunkSizeError,
    #[error("SHA-256 verification failed")]
    FileHashMismatch,
    #[error("chunk acknowledgment timeout")]
    ChunkTimeout,
    #[error("duplicate chunk received")]
    ChunkDuplicate,

    // Storage errors (-740..-749)
    #[error("storage error: {0}")]
    StorageError(String),
    #[error("storage temporarily unavailable")]
    StorageUnavailable,
    #[error("storage quota exceeded")]
    StorageQuotaExceeded,
    #[error("file exceeds maximum allowed size")]
    MaxFileSizeExceeded,
    #[error("file already exists on server")]
    FileAlreadyExists,
    #[error("server storage full")]
    StorageFull,
    #[error("file not found on server")]
    FileNotFoundOnServer,
    #[error("access denied")]
    AccessDenied,
    #[error("invalid filename: {0}")]
    InvalidFilename(String),
    #[error("per-client quota exceeded")]
    ClientQuotaExceeded,

    // File I/O errors (-750..-759)
    #[error("file read error: {0}")]
    FileReadError(String),
    #[error("file write error: {0}")]
    FileWriteError(String),
    #[error("file permission error")]
    FilePermissionError,
    #[error("local file not found")]
    FileNotFound,
    #[error("local disk full")]
    DiskFull,
    #[error("directory not found")]
    DirectoryNotFound,
    #[error("file locked")]
    FileLocked,

    // Resume errors (-760..-779)
    #[error("resume state invalid")]
    ResumeStateInvalid,
    #[error("resume file changed")]
    ResumeFileChanged,
    #[error("resume state corrupted")]
    ResumeStateCorrupted,
    #[error("resume not supported")]
    ResumeNotSupported,
    #[error("resume transfer not found")]
    ResumeTransferNotFound,
    #[error("resume session mismatch")]
    ResumeSessionMismatch,

    // Compression errors (-780..-789)
    #[error("compression failed: {0}")]
    CompressionFailed(String),
    #[error("decompression failed: {0}")]
    DecompressionFailed(String),
    #[error("compression buffer error")]
    CompressionBufferError,
    #[error("invalid compression data")]
    InvalidCompressionData,

    // Configuration errors (-790..-799)
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("chunk size out of bounds: {0}")]
    ConfigChunkSizeError(String),
    #[error("invalid transport configuration: {0}")]
    ConfigTransportError(String),
    #[error("invalid storage path: {0}")]
    ConfigStoragePathError(String),
    #[error("invalid quota configuration: {0}")]
    ConfigQuotaError(String),
    #[error("invalid reconnect configuration: {0}")]
    ConfigReconnectError(String),
}

impl TransferError {
    /// The stable numeric wire code for this error, matching the
    /// `-700..-799` band the protocol error taxonomy was distilled from.
    pub fn code(&self) -> i32 {
        match self {
            Self::ConnectionFailed => -700,
            Self::ConnectionTimeout => -701,
            Self::ConnectionRefused => -702,
            Self::ConnectionLost => -703,
            Self::ReconnectFailed => -704,
            Self::SessionExpired => -705,
            Self::ServerBusy => -706,
            Self::ProtocolMismatch => -707,

            Self::TransferInitFailed(_) => -710,
            Self::TransferCancelled => -711,
            Self::TransferTimeout => -712,
            Self::UploadRejected(_) => -713,
            Self::DownloadRejected(_) => -714,
            Self::TransferAlreadyExists => -715,
            Self::TransferNotFound => -716,
            Self::TransferInProgress => -717,

            Self::ChunkChecksumError(_) => -720,
            Self::ChunkSequenceError => -721,
            Self::ChunkSizeError => -722,
            Self::FileHashMismatch => -723,
            Self::ChunkTimeout => -724,
            Self::ChunkDuplicate => -725,

            Self::StorageError(_) => -740,
            Self::StorageUnavailable => -741,
            Self::StorageQuotaExceeded => -742,
            Self::MaxFileSizeExceeded => -743,
            Self::FileAlreadyExists => -744,
            Self::StorageFull => -745,
            Self::FileNotFoundOnServer => -746,
            Self::AccessDenied => -747,
            Self::InvalidFilename(_) => -748,
            Self::ClientQuotaExceeded => -749,

            Self::FileReadError(_) => -750,
            Self::FileWriteError(_) => -751,
            Self::FilePermissionError => -752,
            Self::FileNotFound => -753,
            Self::DiskFull => -754,
            Self::DirectoryNotFound => -755,
            Self::FileLocked => -756,

            Self::ResumeStateInvalid => -760,
            Self::ResumeFileChanged => -761,
            Self::ResumeStateCorrupted => -762,
            Self::ResumeNotSupported => -763,
            Self::ResumeTransferNotFound => -764,
            Self::ResumeSessionMismatch => -765,

            Self::CompressionFailed(_) => -780,
            Self::DecompressionFailed(_) => -781,
            Self::CompressionBufferError => -782,
            Self::InvalidCompressionData => -783,

            Self::ConfigInvalid(_) => -790,
            Self::ConfigChunkSizeError(_) => -791,
            Self::ConfigTransportError(_) => -792,
            Self::ConfigStoragePathError(_) => -793,
            Self::ConfigQuotaError(_) => -794,
            Self::ConfigReconnectError(_) => -795,
        }
    }

    /// Whether a client should transparently retry the operation that
    /// produced this error (§7 "Retryable").
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed
                | Self::ConnectionTimeout
                | Self::ConnectionLost
                | Self::StorageUnavailable
                | Self::ChunkTimeout
                | Self::TransferTimeout
                | Self::ChunkChecksumError(_)
        )
    }
}

impl From<std::io::Error> for TransferError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => Self::FileNotFound,
            ErrorKind::PermissionDenied => Self::FilePermissionError,
            _ => Self::FileReadError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_band_layout() {
        assert_eq!(TransferError::ConnectionFailed.code(), -700);
        assert_eq!(TransferError::TransferInitFailed(String::new()).code(), -710);
        assert_eq!(TransferError::ChunkChecksumError(0).code(), -720);
        assert_eq!(TransferError::StorageError(String::new()).code(), -740);
        assert_eq!(TransferError::FileReadError(String::new()).code(), -750);
        assert_eq!(TransferError::ResumeStateInvalid.code(), -760);
        assert_eq!(TransferError::CompressionFailed(String::new()).code(), -780);
        assert_eq!(TransferError::ConfigInvalid(String::new()).code(), -790);
    }

    #[test]
    fn checksum_mismatch_triggers_retry() {
        assert!(TransferError::ChunkChecksumError(3).is_retryable());
        assert!(!TransferError::FileHashMismatch.is_retryable());
        assert!(!TransferError::InvalidFilename(String::new()).is_retryable());
    }

    #[test]
    fn io_not_found_maps_to_file_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(TransferError::from(io_err), TransferError::FileNotFound);
    }
}
