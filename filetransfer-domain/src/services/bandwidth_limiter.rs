// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bandwidth Limiter Port
//!
//! Token-bucket rate limiting for transfer throughput (§4, §7). A value of
//! `0` bytes/sec means unlimited throughout this trait, matching the
//! convention of the token-bucket design this was distilled from.

use std::time::Duration;

/// Domain service interface for a token-bucket bandwidth limiter.
///
/// Implementations are expected to hold internal mutable state (the token
/// count and the last-refill timestamp) behind interior mutability, since
/// every method here takes `&self`.
pub trait BandwidthLimiter: Send + Sync {
    /// Blocks the calling thread until `bytes` tokens are available.
    fn acquire(&self, bytes: usize);

    /// Attempts to acquire `bytes` tokens without blocking.
    fn try_acquire(&self, bytes: usize) -> bool;

    /// The wait that `acquire(bytes)` would currently incur, without
    /// consuming any tokens.
    fn estimated_wait(&self, bytes: usize) -> Duration;

    /// Changes the rate limit; takes effect on the next acquire.
    fn set_limit(&self, bytes_per_second: usize);

    fn limit(&self) -> usize;

    /// Whether a limit is currently enforced (`limit() > 0` and not
    /// [`BandwidthLimiter::disable`]d).
    fn is_enabled(&self) -> bool;

    /// Temporarily stops enforcing the limit without forgetting it.
    fn disable(&self);

    /// Resumes enforcement of the configured limit.
    fn enable(&self);

    /// Refills the bucket to full capacity immediately.
    fn reset(&self);

    /// Bytes currently available for an immediate, non-blocking transfer.
    fn available_tokens(&self) -> usize;

    /// Maximum burst size, in bytes.
    fn bucket_capacity(&self) -> usize;
}
