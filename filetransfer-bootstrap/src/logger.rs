// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Logging
//!
//! A minimal logging facade used during process startup, before the
//! core's structured [`filetransfer_domain::Logger`] port is wired up
//! (CLI parsing, config loading, signal handler registration).

/// Severity understood by [`BootstrapLogger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Startup-time logging sink.
pub trait BootstrapLogger: Send + Sync {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Tracing-backed logger, used once `tracing-subscriber` has been
/// initialized.
pub struct ConsoleLogger {
    prefix: String,
}

impl ConsoleLogger {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new("filetransfer")
    }
}

impl BootstrapLogger for ConsoleLogger {
    fn error(&self, message: &str) {
        tracing::error!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }
}

/// Discards everything. Used in tests that don't care about log output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpLogger;

impl BootstrapLogger for NoOpLogger {
    fn error(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
}

#[cfg(test)]
pub struct LogMessage {
    pub level: LogLevel,
    pub message: String,
}

/// Records every call in order, for assertions in tests elsewhere in
/// this crate.
#[cfg(test)]
pub struct CapturingLogger {
    messages: std::sync::Mutex<Vec<LogMessage>>,
}

#[cfg(test)]
impl CapturingLogger {
    pub fn new() -> Self {
        Self { messages: std::sync::Mutex::new(Vec::new()) }
    }

    pub fn messages(&self) -> Vec<LogMessage> {
        let guard = self.messages.lock().unwrap();
        guard
            .iter()
            .map(|m| LogMessage { level: m.level, message: m.message.clone() })
            .collect()
    }

    fn push(&self, level: LogLevel, message: &str) {
        self.messages.lock().unwrap().push(LogMessage { level, message: message.to_string() });
    }
}

#[cfg(test)]
impl BootstrapLogger for CapturingLogger {
    fn error(&self, message: &str) {
        self.push(LogLevel::Error, message);
    }

    fn warn(&self, message: &str) {
        self.push(LogLevel::Warn, message);
    }

    fn info(&self, message: &str) {
        self.push(LogLevel::Info, message);
    }

    fn debug(&self, message: &str) {
        self.push(LogLevel::Debug, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capturing_logger_records_in_order() {
        let logger = CapturingLogger::new();
        logger.info("starting up");
        logger.warn("low disk space");
        logger.error("connection refused");

        let messages = logger.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].level, LogLevel::Info);
        assert_eq!(messages[1].level, LogLevel::Warn);
        assert_eq!(messages[2].level, LogLevel::Error);
        assert_eq!(messages[2].message, "connection refused");
    }

    #[test]
    fn no_op_logger_does_not_panic() {
        let logger = NoOpLogger;
        logger.debug("ignored");
        logger.info("ignored");
        logger.warn("ignored");
        logger.error("ignored");
    }

    #[test]
    fn log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }
}
