// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Statistics Collector (§4.D)
//!
//! Moving-window throughput, ETA, and compression-ratio tracking for one
//! transfer. Counters are relaxed atomics (§5: "snapshots are not atomic
//! across fields — callers must tolerate <= 1 sample of skew"); the
//! sample window is a short-lived mutex-guarded deque, since it's only
//! touched at most every 100ms from the stats-recording thread.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);
const MAX_SAMPLES: usize = 10;
const ETA_RECOMPUTE_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy)]
struct Sample {
    at: Instant,
    cumulative_bytes: u64,
}

struct Window {
    samples: VecDeque<Sample>,
    last_sample_at: Option<Instant>,
    last_eta: Duration,
    last_eta_at: Option<Instant>,
}

/// A consistent read of all counters at one point in time.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsSnapshot {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
    pub chunks_processed: u64,
    pub compressed_chunks: u64,
    pub errors: u64,
    pub current_rate_bps: f64,
    pub average_rate_bps: f64,
    pub eta: Duration,
    pub compression_ratio: f64,
}

pub struct StatisticsCollector {
    total_bytes: AtomicU64,
    bytes_transferred: AtomicU64,
    bytes_on_wire: AtomicU64,
    chunks_processed: AtomicU64,
    compressed_chunks: AtomicU64,
    errors: AtomicU64,
    started_at: Mutex<Option<Instant>>,
    window: Mutex<Window>,
}

impl StatisticsCollector {
    pub fn new() -> Self {
        Self {
            total_bytes: AtomicU64::new(0),
            bytes_transferred: AtomicU64::new(0),
            bytes_on_wire: AtomicU64::new(0),
            chunks_processed: AtomicU64::new(0),
            compressed_chunks: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            started_at: Mutex::new(None),
            window: Mutex::new(Window {
                samples: VecDeque::with_capacity(MAX_SAMPLES),
                last_sample_at: None,
                last_eta: Duration::ZERO,
                last_eta_at: None,
            }),
        }
    }

    pub fn start(&self, total: u64) {
        self.total_bytes.store(total, Ordering::Relaxed);
        *self.started_at.lock().unwrap() = Some(Instant::now());
    }

    /// Records `n` bytes transferred; `on_wire` is the byte count as it
    /// traveled the network (post-compression), used for the compression
    /// ratio.
    pub fn record_bytes_transferred(&self, n: u64, on_wire: u64) {
        self.bytes_transferred.fetch_add(n, Ordering::Relaxed);
        self.bytes_on_wire.fetch_add(on_wire, Ordering::Relaxed);
        self.maybe_sample();
    }

    pub fn record_chunk_processed(&self, compressed: bool) {
        self.chunks_processed.fetch_add(1, Ordering::Relaxed);
        if compressed {
            self.compressed_chunks.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_error(&self, _code: i32) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn maybe_sample(&self) {
        let now = Instant::now();
        let mut window = self.window.lock().unwrap();
        let should_sample = window.last_sample_at.map(|at| now.duration_since(at) >= SAMPLE_INTERVAL).unwrap_or(true);
        if !should_sample {
            return;
        }
        window.last_sample_at = Some(now);
        if window.samples.len() == MAX_SAMPLES {
            window.samples.pop_front();
        }
        window.samples.push_back(Sample { at: now, cumulative_bytes: self.bytes_transferred.load(Ordering::Relaxed) });
    }

    fn current_rate(&self, window: &Window) -> f64 {
        if window.samples.len() < 2 {
            return 0.0;
        }
        let oldest = window.samples.front().unwrap();
        let newest = window.samples.back().unwrap();
        let dt = newest.at.duration_since(oldest.at).as_secs_f64();
        if dt <= 0.0 {
            return 0.0;
        }
        (newest.cumulative_bytes - oldest.cumulative_bytes) as f64 / dt
    }

    fn average_rate(&self) -> f64 {
        let started = *self.started_at.lock().unwrap();
        let Some(started) = started else { return 0.0 };
        let elapsed = started.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.bytes_transferred.load(Ordering::Relaxed) as f64 / elapsed
    }

    /// Returns a consistent snapshot of all counters. ETA is recomputed at
    /// most every 500ms (§4.D); between recomputes the last value is
    /// reused.
    pub fn snapshot(&self) -> StatsSnapshot {
        let total = self.total_bytes.load(Ordering::Relaxed);
        let transferred = self.bytes_transferred.load(Ordering::Relaxed);
        let on_wire = self.bytes_on_wire.load(Ordering::Relaxed);

        let mut window = self.window.lock().unwrap();
        let current_rate = self.current_rate(&window);
        let average_rate = self.average_rate();

        let now = Instant::now();
        let needs_recompute = window.last_eta_at.map(|at| now.duration_since(at) >= ETA_RECOMPUTE_INTERVAL).unwrap_or(true);
        let finished = total > 0 && transferred >= total;
        if needs_recompute {
            window.last_eta = if finished || average_rate <= 0.0 {
                Duration::ZERO
            } else {
                let remaining = total.saturating_sub(transferred) as f64;
                Duration::from_secs_f64(remaining / average_rate)
            };
            window.last_eta_at = Some(now);
        }

        let compression_ratio = if transferred == 0 { 1.0 } else { on_wire as f64 / transferred as f64 };

        StatsSnapshot {
            bytes_transferred: transferred,
            total_bytes: total,
            chunks_processed: self.chunks_processed.load(Ordering::Relaxed),
            compressed_chunks: self.compressed_chunks.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            current_rate_bps: current_rate,
            average_rate_bps: average_rate,
            eta: window.last_eta,
            compression_ratio,
        }
    }
}

impl Default for StatisticsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eta_is_zero_when_finished() {
        let stats = StatisticsCollector::new();
        stats.start(100);
        stats.record_bytes_transferred(100, 100);
        assert_eq!(stats.snapshot().eta, Duration::ZERO);
    }

    #[test]
    fn compression_ratio_reflects_bytes_on_wire() {
        let stats = StatisticsCollector::new();
        stats.start(1000);
        stats.record_bytes_transferred(1000, 500);
        assert!((stats.snapshot().compression_ratio - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_with_no_activity_has_zero_rates() {
        let stats = StatisticsCollector::new();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.current_rate_bps, 0.0);
        assert_eq!(snapshot.average_rate_bps, 0.0);
    }
}
