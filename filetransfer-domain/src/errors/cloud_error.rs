// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Cloud storage error codes, banded `-800` to `-899`.
//!
//! Sub-bands:
//! - `-800..-809` Authentication
//! - `-810..-819` Authorization
//! - `-820..-829` Connection/network
//! - `-830..-839` Bucket/container
//! - `-840..-849` Object/blob
//! - `-850..-859` Transfer
//! - `-860..-869` Quota/limit
//! - `-870..-879` Provider-specific
//! - `-880..-889` Configuration
//! - `-890..-899` Internal

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CloudError {
    // Authentication (-800..-809)
    #[error("authentication failed")]
    AuthFailed,
    #[error("authentication token expired")]
    AuthExpired,
    #[error("invalid credentials provided")]
    AuthInvalidCredentials,
    #[error("credentials not provided")]
    AuthMissingCredentials,
    #[error("failed to refresh authentication token")]
    AuthTokenRefreshFailed,

    // Authorization (-810..-819)
    #[error("access denied to resource")]
    AccessDenied,
    #[error("permission denied for operation")]
    PermissionDenied,
    #[error("resource access forbidden")]
    ResourceForbidden,

    // Connection/network (-820..-829)
    #[error("failed to connect to cloud provider")]
    ConnectionFailed,
    #[error("connection timeout")]
    ConnectionTimeout,
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("DNS resolution failed")]
    DnsResolutionFailed,
    #[error("connection reset by peer")]
    ConnectionReset,
    #[error("cloud service temporarily unavailable")]
    ServiceUnavailable,
    #[error("request rate limited")]
    RateLimited,

    // Bucket/container (-830..-839)
    #[error("bucket or container not found: {0}")]
    BucketNotFound(String),
    #[error("invalid bucket or container name: {0}")]
    InvalidBucketName(String),
    #[error("bucket quota exceeded")]
    BucketQuotaExceeded,

    // Object/blob (-840..-849)
    #[error("object not found: {0}")]
    ObjectNotFound(String),
    #[error("object already exists: {0}")]
    ObjectAlreadyExists(String),
    #[error("invalid object key: {0}")]
    InvalidObjectKey(String),
    #[error("object exceeds maximum size")]
    ObjectTooLarge,
    #[error("checksum verification failed")]
    ChecksumMismatch,
    #[error("object version not found")]
    VersionNotFound,

    // Transfer (-850..-859)
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("download failed: {0}")]
    DownloadFailed(String),
    #[error("multipart upload initialization failed: {0}")]
    MultipartInitFailed(String),
    #[error("multipart upload part failed: {0}")]
    MultipartUploadFailed(String),
    #[error("multipart upload completion failed: {0}")]
    MultipartCompleteFailed(String),
    #[error("multipart upload abort failed: {0}")]
    MultipartAbortFailed(String),
    #[error("transfer was cancelled")]
    TransferCancelled,
    #[error("transfer operation timeout")]
    TransferTimeout,

    // Quota/limit (-860..-869)
    #[error("storage quota exceeded")]
    StorageQuotaExceeded,
    #[error("bandwidth limit exceeded")]
    BandwidthLimitExceeded,
    #[error("request limit exceeded")]
    RequestLimitExceeded,

    // Provider-specific (-870..-879)
    #[error("provider error: {0}")]
    ProviderError(String),
    #[error("operation not supported by provider")]
    UnsupportedOperation,

    // Configuration (-880..-889)
    #[error("invalid cloud configuration: {0}")]
    ConfigInvalid(String),
    #[error("missing endpoint configuration")]
    ConfigMissingEndpoint,
    #[error("missing region configuration")]
    ConfigMissingRegion,
    #[error("missing bucket configuration")]
    ConfigMissingBucket,

    // Internal (-890..-899)
    #[error("internal error: {0}")]
    InternalError(String),
    #[error("cloud storage not initialized")]
    NotInitialized,
    #[error("another operation is in progress")]
    OperationInProgress,
    #[error("invalid state for operation")]
    InvalidState,
}

impl CloudError {
    pub fn code(&self) -> i32 {
        match self {
            Self::AuthFailed => -800,
            Self::AuthExpired => -801,
            Self::AuthInvalidCredentials => -802,
            Self::AuthMissingCredentials => -803,
            Self::AuthTokenRefreshFailed => -804,

            Self::AccessDenied => -810,
            Self::PermissionDenied => -811,
            Self::ResourceForbidden => -812,

            Self::ConnectionFailed => -820,
            Self::ConnectionTimeout => -821,
            Self::NetworkError(_) => -822,
            Self::DnsResolutionFailed => -823,
            Self::ConnectionReset => -825,
            Self::ServiceUnavailable => -826,
            Self::RateLimited => -827,

            Self::BucketNotFound(_) => -830,
            Self::InvalidBucketName(_) => -833,
            Self::BucketQuotaExceeded => -835,

            Self::ObjectNotFound(_) => -840,
            Self::ObjectAlreadyExists(_) => -841,
            Self::InvalidObjectKey(_) => -842,
            Self::ObjectTooLarge => -843,
            Self::ChecksumMismatch => -845,
            Self::VersionNotFound => -847,

            Self::UploadFailed(_) => -850,
            Self::DownloadFailed(_) => -851,
            Self::MultipartInitFailed(_) => -852,
            Self::MultipartUploadFailed(_) => -853,
            Self::MultipartCompleteFailed(_) => -854,
            Self::MultipartAbortFailed(_) => -855,
            Self::TransferCancelled => -856,
            Self::TransferTimeout => -857,

            Self::StorageQuotaExceeded => -860,
            Self::BandwidthLimitExceeded => -861,
            Self::RequestLimitExceeded => -862,

            Self::ProviderError(_) => -870,
            Self::UnsupportedOperation => -874,

            Self::ConfigInvalid(_) => -880,
            Self::ConfigMissingEndpoint => -881,
            Self::ConfigMissingRegion => -882,
            Self::ConfigMissingBucket => -883,

            Self::InternalError(_) => -890,
            Self::NotInitialized => -891,
            Self::OperationInProgress => -893,
            Self::InvalidState => -894,
        }
    }

    /// Maps an HTTP status code observed from a provider response to the
    /// retryable/non-retryable conditions in §4.H.
    ///
    /// Retryable: 408, 429, 500, 502, 503, 504.
    /// Non-retryable: other 4xx (auth/authorization/not-found).
    pub fn from_http_status(status: u16, context: &str) -> Self {
        match status {
            401 => Self::AuthFailed,
            403 => Self::AccessDenied,
            404 => Self::ObjectNotFound(context.to_string()),
            408 => Self::ConnectionTimeout,
            429 => Self::RateLimited,
            500 | 502 | 503 | 504 => Self::ServiceUnavailable,
            _ => Self::ProviderError(format!("HTTP {status}: {context}")),
        }
    }

    /// Whether a retry loop should transparently retry this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed
                | Self::ConnectionTimeout
                | Self::ConnectionReset
                | Self::DnsResolutionFailed
                | Self::ServiceUnavailable
                | Self::RateLimited
                | Self::AuthTokenRefreshFailed
                | Self::UploadFailed(_)
                | Self::DownloadFailed(_)
                | Self::MultipartUploadFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping_matches_retry_policy() {
        assert!(matches!(
            CloudError::from_http_status(503, "put"),
            CloudError::ServiceUnavailable
        ));
        assert!(CloudError::from_http_status(503, "put").is_retryable());
        assert!(!CloudError::from_http_status(404, "get").is_retryable());
        assert!(!CloudError::from_http_status(403, "get").is_retryable());
    }

    #[test]
    fn codes_match_sub_bands() {
        assert_eq!(CloudError::AuthFailed.code(), -800);
        assert_eq!(CloudError::AccessDenied.code(), -810);
        assert_eq!(CloudError::ConnectionFailed.code(), -820);
        assert_eq!(CloudError::BucketNotFound(String::new()).code(), -830);
        assert_eq!(CloudError::ObjectNotFound(String::new()).code(), -840);
        assert_eq!(CloudError::UploadFailed(String::new()).code(), -850);
        assert_eq!(CloudError::StorageQuotaExceeded.code(), -860);
        assert_eq!(CloudError::ProviderError(String::new()).code(), -870);
        assert_eq!(CloudError::ConfigInvalid(String::new()).code(), -880);
        assert_eq!(CloudError::InternalError(String::new()).code(), -890);
    }
}
