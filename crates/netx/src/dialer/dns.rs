use async_trait::async_trait;
use netx_core::{reduce_errors, Context, Endpoint, Failure, NetxError, Operation, Result};
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

use super::{BoxConn, Dialer};
use crate::resolver::Resolver;

/// Resolves the target host and tries each address in order.
///
/// The first successful connection wins and no further address is tried.
/// When every attempt fails the failures are reduced to the most
/// informative one.
#[derive(Debug, Clone)]
pub struct DnsDialer<R, D> {
    resolver: R,
    dialer: D,
}

impl<R: Resolver, D: Dialer> DnsDialer<R, D> {
    /// Resolve with `resolver` and connect each address with `dialer`
    #[must_use]
    pub const fn new(resolver: R, dialer: D) -> Self {
        Self { resolver, dialer }
    }

    /// Resolve `hostname`, short-circuiting IP literals
    pub async fn lookup_host(&self, ctx: &Context, hostname: &str) -> Result<Vec<IpAddr>> {
        if let Ok(ip) = hostname.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }
        self.resolver.lookup_host(ctx, hostname).await
    }
}

#[async_trait]
impl<R: Resolver, D: Dialer> Dialer for DnsDialer<R, D> {
    async fn dial(&self, ctx: &Context, network: &str, address: &str) -> Result<BoxConn> {
        let endpoint: Endpoint = address.parse()?;
        let addrs = self.lookup_host(ctx, endpoint.host()).await?;
        if addrs.is_empty() {
            return Err(NetxError::failure(Failure::DnsNoAnswer, Operation::Resolve));
        }

        let mut errors = Vec::with_capacity(addrs.len());
        for ip in addrs {
            let target = Endpoint::from(SocketAddr::new(ip, endpoint.port())).to_string();
            match self.dialer.dial(ctx, network, &target).await {
                Ok(conn) => return Ok(conn),
                Err(err) => {
                    debug!(address = %target, error = %err, "dial attempt failed");
                    errors.push(err);
                }
            }
        }
        Err(reduce_errors(errors)
            .unwrap_or_else(|| NetxError::failure(Failure::DnsNoAnswer, Operation::Resolve)))
    }
}
