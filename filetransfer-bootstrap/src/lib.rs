// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Layer
//!
//! The composition root's supporting cast: CLI parsing and validation,
//! a startup-time logger, OS facts via [`Platform`](platform::Platform),
//! and coordinated graceful shutdown. None of this knows about chunks,
//! transfers, or cloud providers — the `filetransfer-core` crate wires
//! these primitives to the domain ports it implements.
//!
//! ## Module structure
//!
//! - `cli` — argument parsing and security validation
//! - `logger` — startup-time logging facade
//! - `platform` — CPU/memory/file-durability abstraction
//! - `shutdown` — cancellation token and grace-period coordinator
//! - `adapters` — concrete `Logger`/`Monitor`/`ThreadPoolScheduler` port
//!   implementations (tracing, prometheus, rayon), composed at the CLI
//!   entry point and handed to `filetransfer-core`

pub mod adapters;
pub mod cli;
pub mod logger;
pub mod platform;
pub mod shutdown;

pub use adapters::{PrometheusMonitor, RayonScheduler, TracingLogger};
pub use cli::{bootstrap_cli, parse_and_validate_from, Cli, Command, ValidatedCli, ValidatedCommand, ValidationError};
pub use logger::{BootstrapLogger, ConsoleLogger, NoOpLogger};
pub use platform::{create_platform, Platform, PlatformError};
pub use shutdown::{CancellationToken, ShutdownCoordinator, DEFAULT_GRACE_PERIOD_SECS};
