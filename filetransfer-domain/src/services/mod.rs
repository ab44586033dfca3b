// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Services
//!
//! Synchronous trait ports the infrastructure layer implements: integrity
//! checking, compression, bandwidth limiting, and the external
//! collaborator ports from §6.

pub mod bandwidth_limiter;
pub mod checksum_service;
pub mod compression_service;
pub mod ports;

pub use bandwidth_limiter::BandwidthLimiter;
pub use checksum_service::{ChecksumMismatch, ChecksumService, Sha256Stream};
pub use compression_service::{CompressionService, COMPRESSIBILITY_THRESHOLD};
pub use ports::{HealthReport, HealthStatus, LogFields, LogLevel, Logger, Monitor, Task, ThreadPoolScheduler};
