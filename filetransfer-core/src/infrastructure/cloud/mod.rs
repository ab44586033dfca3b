// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cloud Object Storage (§4.H, §4.I)
//!
//! One [`filetransfer_domain::repositories::CloudStore`] adapter per
//! provider, sharing a retry policy and HTTP client helpers in
//! [`client`] and the request-signing schemes in [`signing`].

pub mod azure;
pub mod client;
pub mod gcs;
pub mod s3;
pub mod signing;

pub use azure::AzureStore;
pub use gcs::GcsStore;
pub use s3::S3Store;
