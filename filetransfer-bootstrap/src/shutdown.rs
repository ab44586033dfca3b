// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Graceful Shutdown
//!
//! A cancellation token plus a coordinator that races an in-flight
//! shutdown against a grace period, so the server pipeline and any open
//! transfers get a bounded window to drain before the process exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

/// Default time allotted for in-flight work to drain once shutdown is
/// requested.
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 5;

/// A cheaply cloneable flag that observers can poll or await.
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// Resolves once [`Self::cancel`] has been called. Resolves
    /// immediately if it already has.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives the shutdown sequence: flips the [`CancellationToken`], then
/// waits up to `grace_period` for [`Self::complete_shutdown`] to be
/// called by the component draining in-flight work.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    grace_period: Duration,
    completed: Arc<Notify>,
    is_shutting_down: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            grace_period,
            completed: Arc::new(Notify::new()),
            is_shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::SeqCst)
    }

    /// Signals cancellation. Idempotent.
    pub fn initiate_shutdown(&self) {
        self.is_shutting_down.store(true, Ordering::SeqCst);
        self.token.cancel();
    }

    /// Signals that draining has finished, waking anyone in
    /// [`Self::wait_for_shutdown`].
    pub fn complete_shutdown(&self) {
        self.completed.notify_waiters();
    }

    /// Initiates shutdown, then waits for either [`Self::complete_shutdown`]
    /// or the grace period to elapse, whichever comes first. Returns `true`
    /// if drained cleanly, `false` if the grace period expired first.
    pub async fn wait_for_shutdown(&self) -> bool {
        self.initiate_shutdown();
        self.wait_with_timeout(self.grace_period).await
    }

    pub async fn wait_with_timeout(&self, timeout: Duration) -> bool {
        tokio::select! {
            _ = self.completed.notified() => true,
            _ = tokio::time::sleep(timeout) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancellation_token_resolves_after_cancel() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        token.cancelled().await;
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn coordinator_completes_before_grace_period() {
        let coordinator = Arc::new(ShutdownCoordinator::new(Duration::from_secs(5)));
        let c = coordinator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            c.complete_shutdown();
        });
        assert!(coordinator.wait_for_shutdown().await);
        assert!(coordinator.is_shutting_down());
    }

    #[tokio::test]
    async fn coordinator_times_out_when_nothing_completes() {
        let coordinator = ShutdownCoordinator::new(Duration::from_millis(20));
        assert!(!coordinator.wait_for_shutdown().await);
    }
}
