// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Rayon-Backed Thread-Pool Scheduler Adapter
//!
//! Implements the domain's [`ThreadPoolScheduler`] port over a single
//! `rayon::ThreadPool`, named and sized the way
//! `adaptive_pipeline::infrastructure::config::rayon_config::RayonPoolManager`
//! builds its pools. Per-stage pending counts are tracked separately
//! from rayon's own internal queue, since rayon does not expose one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use filetransfer_domain::services::ports::{Task, ThreadPoolScheduler};

pub struct RayonScheduler {
    pool: rayon::ThreadPool,
    pending_total: Arc<AtomicUsize>,
    pending_by_stage: Mutex<HashMap<String, Arc<AtomicUsize>>>,
}

impl RayonScheduler {
    /// Builds a pool of `worker_count` threads, named `filetransfer-worker-N`.
    pub fn new(worker_count: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count.max(1))
            .thread_name(|i| format!("filetransfer-worker-{i}"))
            .build()?;
        Ok(Self { pool, pending_total: Arc::new(AtomicUsize::new(0)), pending_by_stage: Mutex::new(HashMap::new()) })
    }

    fn stage_counter(&self, stage: &str) -> Arc<AtomicUsize> {
        let mut table = self.pending_by_stage.lock().unwrap();
        table.entry(stage.to_string()).or_insert_with(|| Arc::new(AtomicUsize::new(0))).clone()
    }

    fn spawn_tracked(&self, task: Task, stage_counter: Option<Arc<AtomicUsize>>) {
        self.pending_total.fetch_add(1, Ordering::Relaxed);
        let pending_total = self.pending_total.clone();
        self.pool.spawn(move || {
            task();
            pending_total.fetch_sub(1, Ordering::Relaxed);
            if let Some(counter) = stage_counter {
                counter.fetch_sub(1, Ordering::Relaxed);
            }
        });
    }
}

impl ThreadPoolScheduler for RayonScheduler {
    fn submit(&self, task: Task) {
        self.spawn_tracked(task, None);
    }

    fn submit_delayed(&self, task: Task, delay: Duration) {
        self.pending_total.fetch_add(1, Ordering::Relaxed);
        let pending_total = self.pending_total.clone();
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            task();
            pending_total.fetch_sub(1, Ordering::Relaxed);
        });
    }

    fn submit_to_stage(&self, task: Task, stage_name: &str) {
        let counter = self.stage_counter(stage_name);
        counter.fetch_add(1, Ordering::Relaxed);
        self.spawn_tracked(task, Some(counter));
    }

    fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn pending_tasks(&self) -> usize {
        self.pending_total.load(Ordering::Relaxed)
    }

    fn pending_tasks_for_stage(&self, stage: &str) -> usize {
        self.pending_by_stage.lock().unwrap().get(stage).map(|c| c.load(Ordering::Relaxed)).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn submitted_task_runs_and_clears_pending_count() {
        let scheduler = RayonScheduler::new(2).unwrap();
        let (tx, rx) = mpsc::channel();
        scheduler.submit(Box::new(move || tx.send(()).unwrap()));
        rx.recv_timeout(Duration::from_secs(2)).unwrap();

        // pending_total is decremented after the closure returns, which
        // races the receiver waking up; give it a moment to settle.
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(scheduler.pending_tasks(), 0);
    }

    #[test]
    fn per_stage_pending_count_tracks_submissions() {
        let scheduler = RayonScheduler::new(1).unwrap();
        let (tx, rx) = mpsc::channel();
        scheduler.submit_to_stage(Box::new(move || tx.send(()).unwrap()), "compress");
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(scheduler.pending_tasks_for_stage("compress"), 0);
        assert_eq!(scheduler.pending_tasks_for_stage("unused-stage"), 0);
    }

    #[test]
    fn worker_count_matches_requested_size() {
        let scheduler = RayonScheduler::new(3).unwrap();
        assert_eq!(scheduler.worker_count(), 3);
    }
}
