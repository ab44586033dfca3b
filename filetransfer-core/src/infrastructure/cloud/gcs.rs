// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Google Cloud Storage Cloud Store Adapter (§4.H)
//!
//! JSON API for object CRUD and listing, resumable upload sessions for
//! the streaming upload path (GCS's multipart-equivalent), and the
//! signed-URL/OAuth-JWT machinery in [`super::signing::gcs_rsa`] for
//! presigned URLs and bearer-token exchange.

use std::io::Read;
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use filetransfer_domain::errors::CloudError;
use filetransfer_domain::repositories::{
    CloudStore, ConnectionState, CopyOptions, DownloadStream, ListObjectsOptions, ListObjectsResult, PresignedMethod,
    PresignedUrlOptions, UploadOptions, UploadStream,
};
use filetransfer_domain::value_objects::CloudObjectMetadata;

use super::client::{build_http_client, map_transport_error, RetryPolicy};
use super::signing::gcs_rsa::{self, GcsCredentials};

const OAUTH_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";
const OAUTH_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const OAUTH_LIFETIME_SECS: i64 = 3600;
const MIN_CHUNK_SIZE: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Default)]
struct CachedToken {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

pub struct GcsStore {
    credentials: GcsCredentials,
    bucket: String,
    client: reqwest::blocking::Client,
    retry: RetryPolicy,
    state: RwLock<ConnectionState>,
    token: Mutex<CachedToken>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct GcsObjectResource {
    name: String,
    size: String,
    etag: String,
    #[serde(rename = "contentType")]
    content_type: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct GcsListResponse {
    #[serde(default)]
    items: Vec<GcsObjectResource>,
    #[serde(default)]
    prefixes: Vec<String>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

impl GcsStore {
    pub fn new(credentials: GcsCredentials, bucket: impl Into<String>) -> Result<Self, CloudError> {
        Ok(Self {
            credentials,
            bucket: bucket.into(),
            client: build_http_client(Duration::from_secs(60))?,
            retry: RetryPolicy::default(),
            state: RwLock::new(ConnectionState::Disconnected),
            token: Mutex::new(CachedToken::default()),
        })
    }

    fn bearer_token(&self) -> Result<String, CloudError> {
        let mut cached = self.token.lock().unwrap();
        let now = Utc::now();
        let stale = match cached.expires_at {
            Some(expires_at) => gcs_rsa::needs_refresh(expires_at, now),
            None => true,
        };
        if !stale {
            return Ok(cached.access_token.clone());
        }

        let assertion = gcs_rsa::build_oauth_jwt(&self.credentials, OAUTH_SCOPE, OAUTH_TOKEN_ENDPOINT, now, OAUTH_LIFETIME_SECS)?;
        let response = self
            .client
            .post(OAUTH_TOKEN_ENDPOINT)
            .form(&[("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"), ("assertion", &assertion)])
            .send()
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            return Err(CloudError::AuthTokenRefreshFailed);
        }
        let parsed: TokenResponse = response.json().map_err(|_| CloudError::AuthTokenRefreshFailed)?;
        cached.access_token = parsed.access_token.clone();
        cached.expires_at = Some(now + chrono::Duration::seconds(parsed.expires_in));
        Ok(parsed.access_token)
    }

    fn object_url(&self, key: &str) -> String {
        format!("https://storage.googleapis.com/storage/v1/b/{}/o/{}", self.bucket, urlencode(key))
    }

    fn upload_url(&self, key: &str) -> String {
        format!("https://storage.googleapis.com/upload/storage/v1/b/{}/o?uploadType=media&name={}", self.bucket, urlencode(key))
    }
}

fn urlencode(key: &str) -> String {
    super::signing::sigv4::percent_encode(key, true)
}

fn object_metadata_from_resource(resource: &GcsObjectResource) -> CloudObjectMetadata {
    let mut metadata = CloudObjectMetadata::new(resource.name.clone(), resource.size.parse().unwrap_or(0), resource.etag.clone());
    metadata.content_type = resource.content_type.clone();
    metadata
}

impl CloudStore for GcsStore {
    fn connect(&self) -> Result<(), CloudError> {
        self.bearer_token()?;
        *self.state.write().unwrap() = ConnectionState::Connected;
        Ok(())
    }

    fn disconnect(&self) -> Result<(), CloudError> {
        *self.state.write().unwrap() = ConnectionState::Disconnected;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        *self.state.read().unwrap() == ConnectionState::Connected
    }

    fn state(&self) -> ConnectionState {
        *self.state.read().unwrap()
    }

    fn upload(&self, key: &str, bytes: &[u8], opts: &UploadOptions) -> Result<CloudObjectMetadata, CloudError> {
        self.retry.execute(|| {
            let token = self.bearer_token()?;
            let content_type = opts.content_type.clone().unwrap_or_else(|| "application/octet-stream".to_string());
            let response = self
                .client
                .post(self.upload_url(key))
                .bearer_auth(&token)
                .header("Content-Type", content_type)
                .body(bytes.to_vec())
                .send()
                .map_err(map_transport_error)?;
            if !response.status().is_success() {
                return Err(CloudError::from_http_status(response.status().as_u16(), key));
            }
            let resource: GcsObjectResource = response.json().map_err(map_transport_error)?;
            Ok(object_metadata_from_resource(&resource))
        })
    }

    fn download(&self, key: &str) -> Result<Vec<u8>, CloudError> {
        self.retry.execute(|| {
            let token = self.bearer_token()?;
            let response = self
                .client
                .get(format!("{}?alt=media", self.object_url(key)))
                .bearer_auth(&token)
                .send()
                .map_err(map_transport_error)?;
            if !response.status().is_success() {
                return Err(CloudError::from_http_status(response.status().as_u16(), key));
            }
            response.bytes().map(|b| b.to_vec()).map_err(map_transport_error)
        })
    }

    fn delete_object(&self, key: &str) -> Result<(), CloudError> {
        self.retry.execute(|| {
            let token = self.bearer_token()?;
            let response = self.client.delete(self.object_url(key)).bearer_auth(&token).send().map_err(map_transport_error)?;
            if response.status().is_success() || response.status().as_u16() == 404 {
                Ok(())
            } else {
                Err(CloudError::from_http_status(response.status().as_u16(), key))
            }
        })
    }

    /// GCS JSON API has no bulk-delete verb either; each key is deleted
    /// individually, same as the Azure adapter.
    fn delete_objects(&self, keys: &[String]) -> Result<Vec<Result<(), CloudError>>, CloudError> {
        Ok(keys.iter().map(|key| self.delete_object(key)).collect())
    }

    fn exists(&self, key: &str) -> Result<bool, CloudError> {
        match self.get_metadata(key) {
            Ok(_) => Ok(true),
            Err(CloudError::ObjectNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn get_metadata(&self, key: &str) -> Result<CloudObjectMetadata, CloudError> {
        self.retry.execute(|| {
            let token = self.bearer_token()?;
            let response = self.client.get(self.object_url(key)).bearer_auth(&token).send().map_err(map_transport_error)?;
            if !response.status().is_success() {
                return Err(CloudError::from_http_status(response.status().as_u16(), key));
            }
            let resource: GcsObjectResource = response.json().map_err(map_transport_error)?;
            Ok(object_metadata_from_resource(&resource))
        })
    }

    fn list_objects(&self, opts: &ListObjectsOptions) -> Result<ListObjectsResult, CloudError> {
        self.retry.execute(|| {
            let token = self.bearer_token()?;
            let mut request = self.client.get(format!("https://storage.googleapis.com/storage/v1/b/{}/o", self.bucket)).bearer_auth(&token);
            request = request.query(&[("maxResults", opts.max_keys.to_string())]);
            if let Some(prefix) = &opts.prefix {
                request = request.query(&[("prefix", prefix)]);
            }
            if let Some(delimiter) = &opts.delimiter {
                request = request.query(&[("delimiter", delimiter)]);
            }
            if let Some(token) = &opts.continuation_token {
                request = request.query(&[("pageToken", token)]);
            }
            let response = request.send().map_err(map_transport_error)?;
            if !response.status().is_success() {
                return Err(CloudError::from_http_status(response.status().as_u16(), "list_objects"));
            }
            let parsed: GcsListResponse = response.json().map_err(map_transport_error)?;
            Ok(ListObjectsResult {
                objects: parsed.items.iter().map(object_metadata_from_resource).collect(),
                common_prefixes: parsed.prefixes,
                is_truncated: parsed.next_page_token.is_some(),
                continuation_token: parsed.next_page_token,
            })
        })
    }

    fn copy_object(&self, src: &str, dst: &str, _opts: &CopyOptions) -> Result<CloudObjectMetadata, CloudError> {
        self.retry.execute(|| {
            let token = self.bearer_token()?;
            let url = format!(
                "https://storage.googleapis.com/storage/v1/b/{}/o/{}/copyTo/b/{}/o/{}",
                self.bucket,
                urlencode(src),
                self.bucket,
                urlencode(dst)
            );
            let response = self.client.post(url).bearer_auth(&token).send().map_err(map_transport_error)?;
            if !response.status().is_success() {
                return Err(CloudError::from_http_status(response.status().as_u16(), dst));
            }
            let resource: GcsObjectResource = response.json().map_err(map_transport_error)?;
            Ok(object_metadata_from_resource(&resource))
        })
    }

    fn create_upload_stream(&self, key: &str, opts: &UploadOptions) -> Result<Box<dyn UploadStream>, CloudError> {
        let token = self.bearer_token()?;
        let content_type = opts.content_type.clone().unwrap_or_else(|| "application/octet-stream".to_string());
        let init_url = format!("https://storage.googleapis.com/upload/storage/v1/b/{}/o?uploadType=resumable&name={}", self.bucket, urlencode(key));
        let response = self
            .client
            .post(init_url)
            .bearer_auth(&token)
            .header("X-Upload-Content-Type", &content_type)
            .send()
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            return Err(CloudError::MultipartInitFailed(format!("resumable session init failed with {}", response.status())));
        }
        let session_url = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| CloudError::MultipartInitFailed("missing Location header on resumable session response".to_string()))?
            .to_string();
        Ok(Box::new(GcsResumableUpload { store: self, key: key.to_string(), session_url, buffer: Vec::new(), bytes_written: 0 }))
    }

    fn create_download_stream(&self, key: &str) -> Result<Box<dyn DownloadStream>, CloudError> {
        let metadata = self.get_metadata(key)?;
        let token = self.bearer_token()?;
        let response = self
            .client
            .get(format!("{}?alt=media", self.object_url(key)))
            .bearer_auth(&token)
            .send()
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            return Err(CloudError::from_http_status(response.status().as_u16(), key));
        }
        Ok(Box::new(GcsDownload { response, metadata, bytes_read: 0 }))
    }

    fn generate_presigned_url(&self, key: &str, opts: &PresignedUrlOptions) -> Result<String, CloudError> {
        match opts.method {
            PresignedMethod::Get => gcs_rsa::sign_url(&self.credentials, &self.bucket, key, opts.expiration_secs, Utc::now()),
            // V4 signed URLs for PUT/DELETE follow the same canonical-request
            // shape with a different HTTP verb; GET is the only method this
            // adapter's callers currently request presigned URLs for.
            _ => Err(CloudError::UnsupportedOperation),
        }
    }
}

struct GcsResumableUpload<'a> {
    store: &'a GcsStore,
    key: String,
    session_url: String,
    buffer: Vec<u8>,
    bytes_written: u64,
}

impl GcsResumableUpload<'_> {
    fn flush_chunk(&mut self, final_chunk: bool) -> Result<Option<GcsObjectResource>, CloudError> {
        if self.buffer.is_empty() && !final_chunk {
            return Ok(None);
        }
        let start = self.bytes_written - self.buffer.len() as u64;
        let end = if self.buffer.is_empty() { start } else { self.bytes_written - 1 };
        let total = if final_chunk { self.bytes_written.to_string() } else { "*".to_string() };
        let content_range = format!("bytes {start}-{end}/{total}");
        let response = self
            .store
            .client
            .put(&self.session_url)
            .header("Content-Range", content_range)
            .body(std::mem::take(&mut self.buffer))
            .send()
            .map_err(map_transport_error)?;
        let status = response.status().as_u16();
        if final_chunk {
            if status == 200 || status == 201 {
                let resource: GcsObjectResource = response.json().map_err(map_transport_error)?;
                return Ok(Some(resource));
            }
            return Err(CloudError::MultipartCompleteFailed(format!("resumable upload finalize failed with {status}")));
        }
        if status != 308 {
            return Err(CloudError::MultipartUploadFailed(format!("resumable upload chunk failed with {status}")));
        }
        Ok(None)
    }
}

impl UploadStream for GcsResumableUpload<'_> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), CloudError> {
        self.buffer.extend_from_slice(bytes);
        self.bytes_written += bytes.len() as u64;
        if self.buffer.len() >= MIN_CHUNK_SIZE {
            self.flush_chunk(false)?;
        }
        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> Result<CloudObjectMetadata, CloudError> {
        let resource = self
            .flush_chunk(true)?
            .ok_or_else(|| CloudError::MultipartCompleteFailed("resumable upload returned no object resource".to_string()))?;
        Ok(object_metadata_from_resource(&resource))
    }

    fn abort(self: Box<Self>) -> Result<(), CloudError> {
        let _ = self.store.client.delete(&self.session_url).send();
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn upload_id(&self) -> Option<&str> {
        Some(&self.session_url)
    }
}

struct GcsDownload {
    response: reqwest::blocking::Response,
    metadata: CloudObjectMetadata,
    bytes_read: u64,
}

impl DownloadStream for GcsDownload {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CloudError> {
        let n = self.response.read(buf).map_err(|e| CloudError::DownloadFailed(e.to_string()))?;
        self.bytes_read += n as u64;
        Ok(n)
    }

    fn has_more(&self) -> bool {
        self.bytes_read < self.metadata.size
    }

    fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    fn total_size(&self) -> Option<u64> {
        Some(self.metadata.size)
    }

    fn metadata(&self) -> &CloudObjectMetadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_metadata_parses_size_string() {
        let resource = GcsObjectResource { name: "a.txt".to_string(), size: "42".to_string(), etag: "abc".to_string(), content_type: None };
        let metadata = object_metadata_from_resource(&resource);
        assert_eq!(metadata.size, 42);
        assert_eq!(metadata.key, "a.txt");
    }
}
