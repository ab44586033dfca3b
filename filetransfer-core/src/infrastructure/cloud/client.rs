// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shared Cloud HTTP Client Helpers (§4.H)
//!
//! One blocking `reqwest` client per adapter instance, plus the retry
//! policy every provider adapter applies uniformly: exponential backoff,
//! bounded attempts, only on [`CloudError::is_retryable`] failures.

use std::time::Duration;

use filetransfer_domain::errors::CloudError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(200),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Runs `op`, retrying on retryable [`CloudError`]s up to
    /// `max_attempts` times with exponential backoff between attempts.
    pub fn execute<T>(&self, mut op: impl FnMut() -> Result<T, CloudError>) -> Result<T, CloudError> {
        let mut delay = self.initial_delay;
        let mut last_err = None;
        for attempt in 0..self.max_attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt + 1 < self.max_attempts => {
                    std::thread::sleep(delay);
                    delay = delay.mul_f64(self.backoff_multiplier).min(self.max_delay);
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or(CloudError::InternalError("retry loop exhausted with no error recorded".to_string())))
    }
}

/// Builds the shared blocking client every provider adapter uses.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::blocking::Client, CloudError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CloudError::ConfigInvalid(format!("failed to build HTTP client: {e}")))
}

/// Maps a `reqwest` transport-level failure (as opposed to a non-2xx
/// response, handled by [`filetransfer_domain::errors::CloudError::from_http_status`]) to a [`CloudError`].
pub fn map_transport_error(err: reqwest::Error) -> CloudError {
    if err.is_timeout() {
        CloudError::ConnectionTimeout
    } else if err.is_connect() {
        CloudError::ConnectionFailed
    } else {
        CloudError::NetworkError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn retry_policy_stops_on_non_retryable_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy { max_attempts: 3, initial_delay: Duration::from_millis(1), ..RetryPolicy::default() };
        let result: Result<(), CloudError> = policy.execute(|| {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(CloudError::AuthFailed)
        });
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn retry_policy_retries_retryable_errors_up_to_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy { max_attempts: 3, initial_delay: Duration::from_millis(1), ..RetryPolicy::default() };
        let result: Result<(), CloudError> = policy.execute(|| {
            calls.fetch_add(1, Ordering::Relaxed);
            Err(CloudError::ServiceUnavailable)
        });
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }
}
