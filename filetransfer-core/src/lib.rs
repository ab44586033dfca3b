// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transfer Core
//!
//! Infrastructure and application layer for the chunked file-transfer
//! system: the wire protocol and QUIC transport, the multi-stage server
//! pipeline, cloud object storage, bandwidth shaping, quota management,
//! statistics, and layered configuration.
//!
//! `filetransfer-domain` defines the ports this crate implements;
//! `filetransfer-bootstrap` supplies the composition root's CLI parsing,
//! platform facts, and concrete `Logger`/`Monitor`/`ThreadPoolScheduler`
//! adapters. The `filetransfer` binary (`src/main.rs`) wires all three
//! together.

pub mod config;
pub mod infrastructure;

pub use config::AppConfig;
pub use infrastructure::pipeline::{PipelineConfig, PipelineDependencies, ServerPipeline};
pub use infrastructure::protocol::{ClientSession, ServerSession, ServerSessionHandlers};
pub use infrastructure::quota::QuotaManager;
pub use infrastructure::stats::StatisticsCollector;
