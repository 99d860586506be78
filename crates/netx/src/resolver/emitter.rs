use async_trait::async_trait;
use netx_core::{Context, Event, EventKind, NetxError, Result};
use std::net::IpAddr;

use super::Resolver;

/// Records each resolution in the run's event log.
///
/// Emits `resolve_start` and then exactly one `resolve_done` carrying the
/// answer or the failure. Without a measurement root this layer does nothing.
#[derive(Debug, Clone)]
pub struct EmitterResolver<R> {
    resolver: R,
}

impl<R> EmitterResolver<R> {
    /// Record resolutions performed by `resolver`
    #[must_use]
    pub const fn new(resolver: R) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl<R: Resolver> Resolver for EmitterResolver<R> {
    async fn lookup_host(&self, ctx: &Context, hostname: &str) -> Result<Vec<IpAddr>> {
        let Some(root) = ctx.measurement_root() else {
            return self.resolver.lookup_host(ctx, hostname).await;
        };
        let resolve_id = root.next_resolve_id();
        root.emit_start(EventKind::ResolveStart, resolve_id, "", hostname);

        let started = root.elapsed();
        let result = self.resolver.lookup_host(ctx, hostname).await;
        let t = root.elapsed();

        root.emit(Event {
            kind: EventKind::ResolveDone,
            correlation_id: resolve_id,
            network: String::new(),
            address: hostname.to_string(),
            addresses: result.as_ref().cloned().unwrap_or_default(),
            failure: result.as_ref().err().map(NetxError::to_failure),
            t,
            duration: Some(t.saturating_sub(started)),
            negotiated_protocol: None,
        });
        result
    }
}
