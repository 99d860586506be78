//! Narrow logging capability used by the logging decorators.

use std::sync::{Mutex, PoisonError};

/// Sink for the human-readable lines written by the logging layers
pub trait Logger: Send + Sync {
    /// Log a debug line
    fn debug(&self, message: &str);

    /// Log an informational line. Defaults to [`Logger::debug`].
    fn info(&self, message: &str) {
        self.debug(message);
    }

    /// Log a warning. Defaults to [`Logger::info`].
    fn warn(&self, message: &str) {
        self.info(message);
    }
}

/// Logger forwarding to `tracing` under the `netx` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "netx", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "netx", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "netx", "{message}");
    }
}

/// Logger keeping every line in memory
#[derive(Debug, Default)]
pub struct SavingLogger {
    lines: Mutex<Vec<String>>,
}

impl SavingLogger {
    /// Create an empty logger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines logged so far
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True if any line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|line| line.contains(needle))
    }
}

impl Logger for SavingLogger {
    fn debug(&self, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saving_logger_keeps_order() {
        let logger = SavingLogger::new();
        logger.debug("dial 1.1.1.1:853");
        logger.warn("dial 1.1.1.1:853... eof_error");
        assert_eq!(
            logger.lines(),
            vec!["dial 1.1.1.1:853", "dial 1.1.1.1:853... eof_error"]
        );
        assert!(logger.contains("eof_error"));
        assert!(!logger.contains("connection_refused"));
    }
}
