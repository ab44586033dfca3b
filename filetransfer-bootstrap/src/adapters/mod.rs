// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Port Adapters (§6)
//!
//! Concrete implementations of `filetransfer_domain::services::ports`,
//! composed at the CLI entry point and handed down into the core crate.

pub mod prometheus_monitor;
pub mod rayon_scheduler;
pub mod tracing_logger;

pub use prometheus_monitor::PrometheusMonitor;
pub use rayon_scheduler::RayonScheduler;
pub use tracing_logger::TracingLogger;
