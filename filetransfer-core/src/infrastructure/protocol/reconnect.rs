// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Reconnect Policy (§4.G)
//!
//! Exponential backoff for re-establishing a dropped connection, ported
//! from `original_source/include/.../client/client_types.h`'s
//! `reconnect_policy` defaults.

use std::thread;
use std::time::Duration;

use filetransfer_domain::errors::TransferError;

/// Exponential-backoff parameters for client reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectPolicy {
    /// The delay before attempt number `attempt` (0-indexed), capped at
    /// `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(scaled).min(self.max_delay)
    }
}

/// Retries `connect_fn` under `policy`'s backoff schedule until it succeeds
/// or `max_attempts` is exhausted, sleeping between attempts. `connect_fn`
/// is expected to perform the actual socket connect and handshake.
pub fn reconnect_with_backoff<T>(policy: &ReconnectPolicy, mut connect_fn: impl FnMut() -> Result<T, TransferError>) -> Result<T, TransferError> {
    let mut last_err = TransferError::ConnectionFailed;
    for attempt in 0..policy.max_attempts {
        match connect_fn() {
            Ok(value) => return Ok(value),
            Err(err) => {
                last_err = err;
                if attempt + 1 < policy.max_attempts {
                    thread::sleep(policy.delay_for_attempt(attempt));
                }
            }
        }
    }
    let _ = last_err;
    Err(TransferError::ReconnectFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn default_matches_original_client_policy() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay, Duration::from_millis(1000));
        assert_eq!(policy.max_delay, Duration::from_millis(30_000));
        assert_eq!(policy.backoff_multiplier, 2.0);
    }

    #[test]
    fn delay_doubles_then_caps() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(10), policy.max_delay);
    }

    #[test]
    fn succeeds_once_connect_fn_stops_failing() {
        let policy = ReconnectPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_multiplier: 1.0,
        };
        let calls = AtomicU32::new(0);
        let result = reconnect_with_backoff(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(TransferError::ConnectionFailed)
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let policy = ReconnectPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            backoff_multiplier: 1.0,
        };
        let result: Result<(), TransferError> = reconnect_with_backoff(&policy, || Err(TransferError::ConnectionFailed));
        assert!(matches!(result, Err(TransferError::ReconnectFailed)));
    }
}
