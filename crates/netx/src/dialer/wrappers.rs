use async_trait::async_trait;
use netx_core::{Context, Logger, NetxError, Operation, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{BoxConn, Dialer};

/// Per-attempt connect timeout
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(15);

/// Bounds each dial attempt by a fixed timeout.
///
/// On expiry the pending attempt is dropped, which closes its socket.
#[derive(Debug, Clone)]
pub struct TimeoutDialer<D> {
    dialer: D,
    timeout: Duration,
}

impl<D> TimeoutDialer<D> {
    /// Wrap `dialer` with [`DEFAULT_DIAL_TIMEOUT`]
    #[must_use]
    pub const fn new(dialer: D) -> Self {
        Self::with_timeout(dialer, DEFAULT_DIAL_TIMEOUT)
    }

    /// Bound each attempt by `timeout`
    #[must_use]
    pub const fn with_timeout(dialer: D, timeout: Duration) -> Self {
        Self { dialer, timeout }
    }
}

#[async_trait]
impl<D: Dialer> Dialer for TimeoutDialer<D> {
    async fn dial(&self, ctx: &Context, network: &str, address: &str) -> Result<BoxConn> {
        tokio::time::timeout(self.timeout, self.dialer.dial(ctx, network, address))
            .await
            .map_err(|_| NetxError::timeout(Operation::Connect))?
    }
}

/// Classifies dial errors with operation `connect`
#[derive(Debug, Clone)]
pub struct ErrorWrapperDialer<D> {
    dialer: D,
}

impl<D> ErrorWrapperDialer<D> {
    /// Classify the failures of `dialer`
    #[must_use]
    pub const fn new(dialer: D) -> Self {
        Self { dialer }
    }
}

#[async_trait]
impl<D: Dialer> Dialer for ErrorWrapperDialer<D> {
    async fn dial(&self, ctx: &Context, network: &str, address: &str) -> Result<BoxConn> {
        self.dialer
            .dial(ctx, network, address)
            .await
            .map_err(|err| err.classify(Operation::Connect))
    }
}

/// Logs every dial attempt and its outcome
pub struct LoggingDialer<D> {
    dialer: D,
    logger: Arc<dyn Logger>,
}

impl<D> LoggingDialer<D> {
    /// Log every attempt made through `dialer`
    #[must_use]
    pub fn new(dialer: D, logger: Arc<dyn Logger>) -> Self {
        Self { dialer, logger }
    }
}

#[async_trait]
impl<D: Dialer> Dialer for LoggingDialer<D> {
    async fn dial(&self, ctx: &Context, network: &str, address: &str) -> Result<BoxConn> {
        let id = ctx.dial_id().map(|id| format!("[#{id}] ")).unwrap_or_default();
        self.logger.debug(&format!("{id}dial {address}/{network}..."));
        let start = Instant::now();
        let result = self.dialer.dial(ctx, network, address).await;
        let elapsed = start.elapsed();
        match &result {
            Ok(_) => self
                .logger
                .debug(&format!("{id}dial {address}/{network}... ok in {elapsed:?}")),
            Err(err) => self
                .logger
                .debug(&format!("{id}dial {address}/{network}... {err} in {elapsed:?}")),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{EofDialer, SlowDialer};
    use netx_core::{Failure, SavingLogger};
    use std::sync::atomic::Ordering;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_drops_pending_attempt() {
        let slow = SlowDialer::new(Duration::from_secs(3600));
        let live = slow.live_attempts();
        let dialer = TimeoutDialer::with_timeout(slow, Duration::from_secs(15));

        let err = dialer
            .dial(&Context::new(), "tcp", "1.1.1.1:853")
            .await
            .err()
            .unwrap();
        assert_eq!(err.classified(), Some(&Failure::GenericTimeoutError));
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_wrapper_classifies_once() {
        let dialer = ErrorWrapperDialer::new(ErrorWrapperDialer::new(EofDialer));
        let err = dialer
            .dial(&Context::new(), "tcp", "1.1.1.1:853")
            .await
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "eof_error");
        match err {
            NetxError::Failure(wrapper) => assert_eq!(wrapper.operation, Operation::Connect),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_logging_reports_failure_with_dial_id() {
        let logger = Arc::new(SavingLogger::new());
        let dialer = LoggingDialer::new(ErrorWrapperDialer::new(EofDialer), logger.clone());
        let ctx = Context::new().with_dial_id(9);
        let result = dialer.dial(&ctx, "tcp", "1.1.1.1:853").await;
        assert!(result.is_err());

        let lines = logger.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "[#9] dial 1.1.1.1:853/tcp...");
        assert!(lines[1].starts_with("[#9] dial 1.1.1.1:853/tcp... eof_error"));
    }
}
