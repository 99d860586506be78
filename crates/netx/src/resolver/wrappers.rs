use async_trait::async_trait;
use netx_core::{Context, Logger, Operation, Result};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use super::Resolver;

/// Classifies resolution errors with operation `resolve`
#[derive(Debug, Clone)]
pub struct ErrorWrapperResolver<R> {
    resolver: R,
}

impl<R> ErrorWrapperResolver<R> {
    /// Classify the failures of `resolver`
    #[must_use]
    pub const fn new(resolver: R) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl<R: Resolver> Resolver for ErrorWrapperResolver<R> {
    async fn lookup_host(&self, ctx: &Context, hostname: &str) -> Result<Vec<IpAddr>> {
        self.resolver
            .lookup_host(ctx, hostname)
            .await
            .map_err(|err| err.classify(Operation::Resolve))
    }
}

/// Logs each resolution and its outcome
pub struct LoggingResolver<R> {
    resolver: R,
    logger: Arc<dyn Logger>,
}

impl<R> LoggingResolver<R> {
    /// Log every resolution made through `resolver`
    #[must_use]
    pub fn new(resolver: R, logger: Arc<dyn Logger>) -> Self {
        Self { resolver, logger }
    }
}

#[async_trait]
impl<R: Resolver> Resolver for LoggingResolver<R> {
    async fn lookup_host(&self, ctx: &Context, hostname: &str) -> Result<Vec<IpAddr>> {
        self.logger.debug(&format!("resolve {hostname}..."));
        let start = Instant::now();
        let result = self.resolver.lookup_host(ctx, hostname).await;
        let elapsed = start.elapsed();
        match &result {
            Ok(addrs) => self
                .logger
                .debug(&format!("resolve {hostname}... {addrs:?} in {elapsed:?}")),
            Err(err) => self
                .logger
                .debug(&format!("resolve {hostname}... {err} in {elapsed:?}")),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockableResolver;
    use netx_core::{Failure, SavingLogger};

    #[tokio::test]
    async fn test_error_wrapper() {
        let resolver = ErrorWrapperResolver::new(MockableResolver::failing(
            "lookup antani.ooni.nu: no such host",
        ));
        let err = resolver
            .lookup_host(&Context::new(), "antani.ooni.nu")
            .await
            .unwrap_err();
        assert_eq!(err.classified(), Some(&Failure::DnsNxdomainError));
    }

    #[tokio::test]
    async fn test_logging_does_not_alter_result() {
        let logger = Arc::new(SavingLogger::new());
        let addrs: Vec<IpAddr> = vec!["1.1.1.1".parse().unwrap()];
        let resolver = LoggingResolver::new(MockableResolver::answering(addrs.clone()), logger.clone());
        let got = resolver
            .lookup_host(&Context::new(), "one.one.one.one")
            .await
            .unwrap();
        assert_eq!(got, addrs);
        assert_eq!(logger.lines()[0], "resolve one.one.one.one...");
        assert!(logger.lines()[1].contains("[1.1.1.1]"));
    }
}
