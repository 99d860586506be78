use async_trait::async_trait;
use hickory_resolver::TokioResolver;
use netx_core::{Context, Endpoint, NetxError, Operation, Result};
use std::net::IpAddr;

use super::{dedup, Resolver};

/// Resolver backed by the platform's `getaddrinfo`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn lookup_host(&self, ctx: &Context, hostname: &str) -> Result<Vec<IpAddr>> {
        // port 0 since only the addresses matter
        let target = Endpoint::new(hostname, 0).to_string();
        ctx.run(Operation::Resolve, async {
            let addrs = tokio::net::lookup_host(target).await?;
            Ok(dedup(addrs.map(|a| a.ip())))
        })
        .await
    }
}

/// Resolver backed by hickory with the system configuration
pub struct HickoryResolver {
    inner: TokioResolver,
}

impl HickoryResolver {
    /// Build from `/etc/resolv.conf` (or the platform equivalent)
    pub fn from_system_conf() -> Result<Self> {
        let inner = TokioResolver::builder_tokio()
            .map_err(|e| NetxError::Config(format!("failed to create resolver: {e}")))?
            .build();
        Ok(Self { inner })
    }
}

#[async_trait]
impl Resolver for HickoryResolver {
    async fn lookup_host(&self, ctx: &Context, hostname: &str) -> Result<Vec<IpAddr>> {
        ctx.run(Operation::Resolve, async {
            let lookup = self
                .inner
                .lookup_ip(hostname)
                .await
                .map_err(NetxError::other)?;
            Ok(dedup(lookup.iter()))
        })
        .await
    }
}
