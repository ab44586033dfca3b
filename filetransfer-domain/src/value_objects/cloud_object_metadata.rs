// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cloud Object Metadata Value Object

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Provider-agnostic metadata for one object in cloud storage (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudObjectMetadata {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub etag: String,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    /// Opaque, provider-specific storage class string (see §4.H).
    pub storage_class: Option<String>,
    pub version_id: Option<String>,
    pub md5: Option<String>,
    pub custom_metadata: HashMap<String, String>,
}

impl CloudObjectMetadata {
    pub fn new(key: String, size: u64, etag: String) -> Self {
        Self {
            key,
            size,
            last_modified: Utc::now(),
            etag,
            content_type: None,
            content_encoding: None,
            storage_class: None,
            version_id: None,
            md5: None,
            custom_metadata: HashMap::new(),
        }
    }
}
