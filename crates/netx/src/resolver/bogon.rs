use async_trait::async_trait;
use netx_core::{is_bogon, Context, ErrWrapper, Failure, Operation, Result};
use std::net::IpAddr;
use thiserror::Error;
use tracing::warn;

use super::Resolver;

/// The answer that made a resolution fail with `dns_bogon_error`
#[derive(Error, Debug, Clone)]
#[error("{hostname} resolved to bogon addresses {bogons:?} (full answer {addresses:?})")]
pub struct BogonAnswer {
    pub hostname: String,
    pub addresses: Vec<IpAddr>,
    pub bogons: Vec<IpAddr>,
}

/// Fails the whole resolution when any returned address is a bogon
#[derive(Debug, Clone)]
pub struct BogonResolver<R> {
    resolver: R,
}

impl<R> BogonResolver<R> {
    /// Reject answers from `resolver` that contain a bogon
    #[must_use]
    pub const fn new(resolver: R) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl<R: Resolver> Resolver for BogonResolver<R> {
    async fn lookup_host(&self, ctx: &Context, hostname: &str) -> Result<Vec<IpAddr>> {
        let addresses = self.resolver.lookup_host(ctx, hostname).await?;
        let bogons: Vec<IpAddr> = addresses.iter().copied().filter(|a| is_bogon(*a)).collect();
        if bogons.is_empty() {
            return Ok(addresses);
        }
        warn!(hostname, ?bogons, "bogon address in DNS answer");
        Err(ErrWrapper::new(Failure::DnsBogonError, Operation::Resolve)
            .with_source(BogonAnswer {
                hostname: hostname.to_string(),
                addresses,
                bogons,
            })
            .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockableResolver;
    use std::error::Error as _;

    fn ips(list: &[&str]) -> Vec<IpAddr> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_clean_answer_passes() {
        let resolver = BogonResolver::new(MockableResolver::answering(ips(&["1.1.1.1", "1.0.0.1"])));
        let addrs = resolver
            .lookup_host(&Context::new(), "dns.example")
            .await
            .unwrap();
        assert_eq!(addrs, ips(&["1.1.1.1", "1.0.0.1"]));
    }

    #[tokio::test]
    async fn test_any_bogon_fails_whole_answer() {
        let answers = [
            ips(&["10.0.0.1"]),
            ips(&["1.1.1.1", "127.0.0.1"]),
            ips(&["fe80::1", "2606:4700::1111"]),
            ips(&["1.1.1.1", "8.8.8.8", "192.168.1.1"]),
        ];
        for answer in answers {
            let resolver = BogonResolver::new(MockableResolver::answering(answer.clone()));
            let err = resolver
                .lookup_host(&Context::new(), "dns.example")
                .await
                .unwrap_err();
            assert_eq!(err.classified(), Some(&Failure::DnsBogonError), "{answer:?}");
            let source = err.source().unwrap().to_string();
            assert!(source.contains("bogon"), "{source}");
        }
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let resolver = BogonResolver::new(MockableResolver::failing("mocked error"));
        let err = resolver
            .lookup_host(&Context::new(), "dns.example")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "mocked error");
    }
}
