// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Error Taxonomy
//!
//! Two numeric-banded error enums carry every failure in the system:
//!
//! - [`TransferError`] — connection, transfer, chunk, storage, file I/O,
//!   resume, compression, and configuration failures (`-700..-799`).
//! - [`CloudError`] — cloud provider failures, sub-banded by concern
//!   (`-800..-899`).
//!
//! Both implement [`std::error::Error`] via `thiserror` and expose a
//! `code()` accessor returning the wire-level numeric code, plus
//! `is_retryable()` for the client retry policy in §7.

mod cloud_error;
mod transfer_error;

pub use cloud_error::CloudError;
pub use transfer_error::TransferError;
