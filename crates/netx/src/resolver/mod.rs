//! Resolver chain.
//!
//! The default chain built by [`crate::httptransport::new_resolver`] is
//!
//! ```text
//! LoggingResolver(EmitterResolver(ErrorWrapperResolver(BogonResolver(SystemResolver))))
//! ```
//!
//! with the logging layer present only when a logger is configured. Bogon
//! detection sits below classification so a bogon answer surfaces as
//! `dns_bogon_error` and never as a success, and the emitter records the
//! classified outcome.

mod bogon;
mod emitter;
mod system;
mod wrappers;

pub use bogon::{BogonAnswer, BogonResolver};
pub use emitter::EmitterResolver;
pub use system::{HickoryResolver, SystemResolver};
pub use wrappers::{ErrorWrapperResolver, LoggingResolver};

use async_trait::async_trait;
use netx_core::{Context, Result};
use std::net::IpAddr;
use std::sync::Arc;

/// Resolves hostnames to addresses
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `hostname` to its addresses, in answer order without duplicates
    async fn lookup_host(&self, ctx: &Context, hostname: &str) -> Result<Vec<IpAddr>>;
}

#[async_trait]
impl<T: Resolver + ?Sized> Resolver for Arc<T> {
    async fn lookup_host(&self, ctx: &Context, hostname: &str) -> Result<Vec<IpAddr>> {
        (**self).lookup_host(ctx, hostname).await
    }
}

#[async_trait]
impl<T: Resolver + ?Sized> Resolver for Box<T> {
    async fn lookup_host(&self, ctx: &Context, hostname: &str) -> Result<Vec<IpAddr>> {
        (**self).lookup_host(ctx, hostname).await
    }
}

/// Remove duplicates keeping the first occurrence
pub(crate) fn dedup(addrs: impl IntoIterator<Item = IpAddr>) -> Vec<IpAddr> {
    let mut out: Vec<IpAddr> = Vec::new();
    for addr in addrs {
        if !out.contains(&addr) {
            out.push(addr);
        }
    }
    out
}
