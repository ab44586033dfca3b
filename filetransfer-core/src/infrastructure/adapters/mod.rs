// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Adapters
//!
//! Concrete implementations of the domain's integrity and compression
//! ports (§4.A, §4.B).

pub mod checksum;
pub mod compression;

pub use checksum::Crc32Sha256Checksum;
pub use compression::AdaptiveLz4Compression;
