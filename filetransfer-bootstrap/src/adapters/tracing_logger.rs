// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tracing-Backed Logger Adapter
//!
//! Implements the domain's [`Logger`] port over `tracing`, the crate this
//! workspace already uses for startup logging (see [`crate::ConsoleLogger`]).
//! Structured [`LogFields`] are attached as `tracing` key-value fields
//! rather than interpolated into the message string, so they stay
//! queryable by a JSON-formatting subscriber.

use filetransfer_domain::services::ports::{LogFields, LogLevel, Logger};

/// Logs through a named `tracing` target, carrying §6's structured fields.
pub struct TracingLogger {
    target: &'static str,
}

impl TracingLogger {
    pub fn new(target: &'static str) -> Self {
        Self { target }
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("filetransfer")
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, fields: &LogFields) {
        macro_rules! emit {
            ($macro:ident) => {
                tracing::$macro!(
                    target: self.target,
                    transfer_id = ?fields.transfer_id,
                    filename = ?fields.filename,
                    file_size = ?fields.file_size,
                    bytes_transferred = ?fields.bytes_transferred,
                    chunk_index = ?fields.chunk_index,
                    total_chunks = ?fields.total_chunks,
                    progress_percent = ?fields.progress_percent,
                    rate_mbps = ?fields.rate_mbps,
                    duration_ms = ?fields.duration_ms,
                    error_message = ?fields.error_message,
                    "{}",
                    message,
                )
            };
        }

        match level {
            LogLevel::Trace => emit!(trace),
            LogLevel::Debug => emit!(debug),
            LogLevel::Info => emit!(info),
            LogLevel::Warn => emit!(warn),
            LogLevel::Error => emit!(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_at_every_level_does_not_panic() {
        let logger = TracingLogger::default();
        let fields = LogFields { transfer_id: Some("t-1".to_string()), ..LogFields::default() };
        logger.log(LogLevel::Trace, "trace", &LogFields::default());
        logger.log(LogLevel::Debug, "debug", &LogFields::default());
        logger.info("info via default fields");
        logger.log(LogLevel::Warn, "warn", &fields);
        logger.error("error via default fields");
    }
}
