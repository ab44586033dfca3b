// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cloud Object Store Port
//!
//! A provider-agnostic interface over S3, Azure Blob, and GCS (§4.H).
//! Concrete adapters in the infrastructure layer translate these calls
//! into each provider's REST/JSON/XML wire format and SigV4/SharedKey/
//! RSA-SHA256 signing (§4.I).

use crate::errors::CloudError;
use crate::value_objects::CloudObjectMetadata;

/// Connection lifecycle state of a cloud store adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// HTTP verb a presigned URL is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresignedMethod {
    Get,
    Put,
    Delete,
}

/// Options accepted by [`CloudStore::upload`] and the streaming upload
/// path.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub content_type: Option<String>,
    pub storage_class: Option<String>,
    pub metadata: Vec<(String, String)>,
}

/// Options for [`CloudStore::generate_presigned_url`].
#[derive(Debug, Clone)]
pub struct PresignedUrlOptions {
    pub method: PresignedMethod,
    pub expiration_secs: u64,
    pub content_type: Option<String>,
    pub content_md5: Option<String>,
}

/// Options for [`CloudStore::copy_object`].
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    pub storage_class: Option<String>,
    pub metadata: Vec<(String, String)>,
}

/// Options for [`CloudStore::list_objects`].
#[derive(Debug, Clone)]
pub struct ListObjectsOptions {
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    pub max_keys: u32,
    pub continuation_token: Option<String>,
    pub start_after: Option<String>,
}

impl Default for ListObjectsOptions {
    fn default() -> Self {
        Self {
            prefix: None,
            delimiter: Some("/".to_string()),
            max_keys: 1000,
            continuation_token: None,
            start_after: None,
        }
    }
}

/// Result page from [`CloudStore::list_objects`].
#[derive(Debug, Clone, Default)]
pub struct ListObjectsResult {
    pub objects: Vec<CloudObjectMetadata>,
    pub common_prefixes: Vec<String>,
    pub is_truncated: bool,
    pub continuation_token: Option<String>,
}

/// Progress reported at implementation-chosen granularity during a
/// streaming upload or download (recommended <= 100ms, §4.H).
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferProgress {
    pub bytes_transferred: u64,
    pub total_bytes: Option<u64>,
    pub speed_bps: f64,
    pub current_part: Option<u32>,
    pub total_parts: Option<u32>,
}

/// A multipart/resumable upload in progress.
pub trait UploadStream: Send {
    fn write(&mut self, bytes: &[u8]) -> Result<(), CloudError>;
    fn finalize(self: Box<Self>) -> Result<CloudObjectMetadata, CloudError>;
    fn abort(self: Box<Self>) -> Result<(), CloudError>;
    fn bytes_written(&self) -> u64;
    fn upload_id(&self) -> Option<&str>;
}

/// A streamed object download.
pub trait DownloadStream: Send {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CloudError>;
    fn has_more(&self) -> bool;
    fn bytes_read(&self) -> u64;
    fn total_size(&self) -> Option<u64>;
    fn metadata(&self) -> &CloudObjectMetadata;
}

/// Provider-agnostic object store, implemented once per backend (S3,
/// Azure Blob, GCS) in the infrastructure layer.
pub trait CloudStore: Send + Sync {
    fn connect(&self) -> Result<(), CloudError>;
    fn disconnect(&self) -> Result<(), CloudError>;
    fn is_connected(&self) -> bool;
    fn state(&self) -> ConnectionState;

    fn upload(&self, key: &str, bytes: &[u8], opts: &UploadOptions) -> Result<CloudObjectMetadata, CloudError>;
    fn download(&self, key: &str) -> Result<Vec<u8>, CloudError>;
    fn delete_object(&self, key: &str) -> Result<(), CloudError>;
    fn delete_objects(&self, keys: &[String]) -> Result<Vec<Result<(), CloudError>>, CloudError>;
    fn exists(&self, key: &str) -> Result<bool, CloudError>;
    fn get_metadata(&self, key: &str) -> Result<CloudObjectMetadata, CloudError>;
    fn list_objects(&self, opts: &ListObjectsOptions) -> Result<ListObjectsResult, CloudError>;
    fn copy_object(&self, src: &str, dst: &str, opts: &CopyOptions) -> Result<CloudObjectMetadata, CloudError>;

    fn create_upload_stream(&self, key: &str, opts: &UploadOptions) -> Result<Box<dyn UploadStream>, CloudError>;
    fn create_download_stream(&self, key: &str) -> Result<Box<dyn DownloadStream>, CloudError>;

    fn generate_presigned_url(&self, key: &str, opts: &PresignedUrlOptions) -> Result<String, CloudError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_objects_defaults_match_provider_convention() {
        let opts = ListObjectsOptions::default();
        assert_eq!(opts.max_keys, 1000);
        assert_eq!(opts.delimiter.as_deref(), Some("/"));
    }
}
