// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Repositories
//!
//! Storage-facing domain ports: the provider-agnostic cloud object store
//! and the QUIC session-ticket store.

pub mod cloud_store;
pub mod session_ticket_store;

pub use cloud_store::{
    CloudStore, ConnectionState, CopyOptions, DownloadStream, ListObjectsOptions, ListObjectsResult,
    PresignedMethod, PresignedUrlOptions, TransferProgress, UploadOptions, UploadStream,
};
pub use session_ticket_store::{SessionTicketStore, DEFAULT_MAX_TICKETS};
