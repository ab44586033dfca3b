// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Token-Bucket Bandwidth Limiter
//!
//! One mutex guards the bucket's tokens and last-refill timestamp; a
//! condvar wakes blocked `acquire` callers whenever the limit changes or
//! the limiter is disabled (§4.C, §5 "disabling wakes all waiters").

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use filetransfer_domain::services::BandwidthLimiter;

struct Bucket {
    tokens: f64,
    capacity: f64,
    rate: f64,
    enabled: bool,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self) {
        if self.rate <= 0.0 {
            return;
        }
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + self.rate * elapsed).min(self.capacity);
        self.last_refill = now;
    }

    fn disabled_or_unbounded(&self) -> bool {
        !self.enabled || self.rate <= 0.0
    }
}

pub struct TokenBucketLimiter {
    bucket: Mutex<Bucket>,
    condvar: Condvar,
}

impl TokenBucketLimiter {
    /// `bytes_per_second == 0` starts the limiter disabled (§4.C).
    pub fn new(bytes_per_second: usize) -> Self {
        let rate = bytes_per_second as f64;
        Self {
            bucket: Mutex::new(Bucket {
                tokens: rate,
                capacity: rate,
                rate,
                enabled: bytes_per_second > 0,
                last_refill: Instant::now(),
            }),
            condvar: Condvar::new(),
        }
    }
}

impl BandwidthLimiter for TokenBucketLimiter {
    fn acquire(&self, bytes: usize) {
        let need = bytes as f64;
        let mut guard = self.bucket.lock();
        loop {
            guard.refill();
            if guard.disabled_or_unbounded() {
                return;
            }
            if guard.tokens >= need {
                guard.tokens -= need;
                return;
            }
            let shortfall = need - guard.tokens;
            let wait = Duration::from_secs_f64((shortfall / guard.rate).max(0.001));
            let result = self.condvar.wait_for(&mut guard, wait);
            if result.timed_out() {
                // loop back around and re-check; a spurious wake or a
                // disable/set_limit may have changed the picture.
                continue;
            }
        }
    }

    fn try_acquire(&self, bytes: usize) -> bool {
        let need = bytes as f64;
        let mut guard = self.bucket.lock();
        guard.refill();
        if guard.disabled_or_unbounded() {
            return true;
        }
        if guard.tokens >= need {
            guard.tokens -= need;
            true
        } else {
            false
        }
    }

    fn estimated_wait(&self, bytes: usize) -> Duration {
        let need = bytes as f64;
        let mut guard = self.bucket.lock();
        guard.refill();
        if guard.disabled_or_unbounded() || guard.tokens >= need {
            return Duration::ZERO;
        }
        Duration::from_secs_f64((need - guard.tokens) / guard.rate)
    }

    fn set_limit(&self, bytes_per_second: usize) {
        let mut guard = self.bucket.lock();
        guard.refill();
        let new_rate = bytes_per_second as f64;
        let new_capacity = new_rate;
        if guard.capacity > 0.0 {
            guard.tokens = (guard.tokens * new_capacity / guard.capacity).min(new_capacity);
        } else {
            guard.tokens = new_capacity;
        }
        guard.rate = new_rate;
        guard.capacity = new_capacity;
        guard.enabled = bytes_per_second > 0;
        drop(guard);
        self.condvar.notify_all();
    }

    fn limit(&self) -> usize {
        self.bucket.lock().rate as usize
    }

    fn is_enabled(&self) -> bool {
        let guard = self.bucket.lock();
        guard.enabled && guard.rate > 0.0
    }

    fn disable(&self) {
        self.bucket.lock().enabled = false;
        self.condvar.notify_all();
    }

    fn enable(&self) {
        let mut guard = self.bucket.lock();
        guard.enabled = guard.rate > 0.0;
        drop(guard);
        self.condvar.notify_all();
    }

    fn reset(&self) {
        let mut guard = self.bucket.lock();
        guard.tokens = guard.capacity;
        guard.last_refill = Instant::now();
        drop(guard);
        self.condvar.notify_all();
    }

    fn available_tokens(&self) -> usize {
        let mut guard = self.bucket.lock();
        guard.refill();
        if guard.disabled_or_unbounded() {
            usize::MAX
        } else {
            guard.tokens as usize
        }
    }

    fn bucket_capacity(&self) -> usize {
        self.bucket.lock().capacity as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn invariant_tokens_within_capacity() {
        let limiter = TokenBucketLimiter::new(1_000_000);
        assert_eq!(limiter.bucket_capacity(), 1_000_000);
        assert!(limiter.available_tokens() <= limiter.bucket_capacity());
    }

    #[test]
    fn disabled_limiter_never_blocks() {
        let limiter = TokenBucketLimiter::new(0);
        assert!(!limiter.is_enabled());
        assert_eq!(limiter.available_tokens(), usize::MAX);
        limiter.acquire(10_000_000_000);
        assert!(limiter.try_acquire(10_000_000_000));
    }

    #[test]
    fn try_acquire_fails_once_bucket_is_drained() {
        let limiter = TokenBucketLimiter::new(1000);
        assert!(limiter.try_acquire(1000));
        assert!(!limiter.try_acquire(1));
    }

    #[test]
    fn set_limit_scales_tokens_proportionally() {
        let limiter = TokenBucketLimiter::new(1000);
        limiter.try_acquire(500);
        assert_eq!(limiter.available_tokens(), 500);
        limiter.set_limit(2000);
        assert_eq!(limiter.available_tokens(), 1000);
    }

    #[test]
    fn four_megabyte_acquires_at_one_mebibyte_per_second_take_three_to_four_seconds() {
        let limiter = Arc::new(TokenBucketLimiter::new(1024 * 1024));
        let start = Instant::now();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = limiter.clone();
                thread::spawn(move || limiter.acquire(1024 * 1024))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3), "elapsed was {elapsed:?}");
        assert!(elapsed <= Duration::from_secs(5), "elapsed was {elapsed:?}");
    }
}
