//! HTTP transport assembly.
//!
//! [`new`] composes the full stack. Layers, outermost first:
//!
//! ```text
//! UserAgentTransport -> LoggingTransport -> ByteCountingTransport -> SystemTransport
//! ```
//!
//! Logging sees the request after the default `User-Agent` is injected and
//! byte counting sits right above the wire.

mod bytecounting;
mod logging;
mod system;
mod useragent;

pub use bytecounting::ByteCountingTransport;
pub use logging::LoggingTransport;
pub use system::SystemTransport;
pub use useragent::UserAgentTransport;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use netx_core::{Context, Result};
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::dialer::{
    Dialer, DnsDialer, EmitterDialer, ErrorWrapperDialer, LoggingDialer, ProxyDialer, SystemDialer,
    TimeoutDialer,
};
use crate::resolver::{
    BogonResolver, EmitterResolver, ErrorWrapperResolver, LoggingResolver, Resolver, SystemResolver,
};
use crate::tls::{
    default_tls_config, EmitterTlsHandshaker, ErrorWrapperTlsHandshaker, LoggingTlsHandshaker,
    SystemTlsHandshaker, TimeoutTlsHandshaker, TlsDialer, TlsHandshakeDialer, TlsHandshaker,
};

/// Performs HTTP round trips
#[async_trait]
pub trait RoundTripper: Send + Sync {
    /// Send `req` and read the whole response body
    async fn round_trip(&self, ctx: &Context, req: Request<Bytes>) -> Result<Response<Bytes>>;

    /// Drop pooled idle connections
    fn close_idle_connections(&self) {}
}

#[async_trait]
impl<T: RoundTripper + ?Sized> RoundTripper for Arc<T> {
    async fn round_trip(&self, ctx: &Context, req: Request<Bytes>) -> Result<Response<Bytes>> {
        (**self).round_trip(ctx, req).await
    }

    fn close_idle_connections(&self) {
        (**self).close_idle_connections();
    }
}

/// Build the default resolver chain:
/// `Logging(Emitter(ErrorWrapper(Bogon(leaf))))`, logging only with a logger
pub fn new_resolver(config: &Config) -> Arc<dyn Resolver> {
    let leaf: Arc<dyn Resolver> = config
        .leaf_resolver
        .clone()
        .unwrap_or_else(|| Arc::new(SystemResolver));
    let chain = EmitterResolver::new(ErrorWrapperResolver::new(BogonResolver::new(leaf)));
    match &config.logger {
        Some(logger) => Arc::new(LoggingResolver::new(chain, Arc::clone(logger))),
        None => Arc::new(chain),
    }
}

/// Build the default dialer chain on top of `resolver`:
/// `Dns(resolver, Proxy(Emitter(Logging(ErrorWrapper(Timeout(System))))))`
pub fn new_dialer(config: &Config, resolver: Arc<dyn Resolver>) -> Arc<dyn Dialer> {
    let base = ErrorWrapperDialer::new(TimeoutDialer::with_timeout(SystemDialer, config.dial_timeout));
    let logged: Arc<dyn Dialer> = match &config.logger {
        Some(logger) => Arc::new(LoggingDialer::new(base, Arc::clone(logger))),
        None => Arc::new(base),
    };
    let proxied = ProxyDialer::new(EmitterDialer::new(logged), config.proxy_url.clone());
    Arc::new(DnsDialer::new(resolver, proxied))
}

/// Build the default TLS dialer on top of `dialer`
pub fn new_tls_dialer(config: &Config, dialer: Arc<dyn Dialer>) -> Result<Arc<dyn TlsDialer>> {
    let tls_config = match &config.tls_config {
        Some(tls_config) => Arc::clone(tls_config),
        None => default_tls_config()?,
    };
    let base = ErrorWrapperTlsHandshaker::new(TimeoutTlsHandshaker::with_timeout(
        SystemTlsHandshaker,
        config.tls_handshake_timeout,
    ));
    let handshaker: Arc<dyn TlsHandshaker> = match &config.logger {
        Some(logger) => Arc::new(LoggingTlsHandshaker::new(base, Arc::clone(logger))),
        None => Arc::new(base),
    };
    Ok(Arc::new(TlsHandshakeDialer::new(
        dialer,
        EmitterTlsHandshaker::new(handshaker),
        tls_config,
    )))
}

/// Build a complete transport from `config`.
///
/// Unset fields fall back to the defaults documented on [`Config`].
pub fn new(config: Config) -> Result<Arc<dyn RoundTripper>> {
    debug!(?config, "building transport");
    let resolver = config
        .resolver
        .clone()
        .unwrap_or_else(|| new_resolver(&config));
    let dialer = config
        .dialer
        .clone()
        .unwrap_or_else(|| new_dialer(&config, resolver));
    let tls_dialer = match &config.tls_dialer {
        Some(tls_dialer) => Arc::clone(tls_dialer),
        None => new_tls_dialer(&config, Arc::clone(&dialer))?,
    };

    let mut txp: Arc<dyn RoundTripper> = Arc::new(SystemTransport::new(dialer, tls_dialer));
    if let Some(counter) = &config.byte_counter {
        txp = Arc::new(ByteCountingTransport::new(txp, Arc::clone(counter)));
    }
    if let Some(logger) = &config.logger {
        txp = Arc::new(LoggingTransport::new(txp, Arc::clone(logger)));
    }
    Ok(Arc::new(UserAgentTransport::new(txp)))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use netx_core::{Failure, NetxError, Operation};

    /// Answers 200 with a fixed body, or fails with `connection_reset`
    pub struct StaticTransport {
        body: Option<&'static [u8]>,
    }

    impl StaticTransport {
        pub const fn ok(body: &'static [u8]) -> Self {
            Self { body: Some(body) }
        }

        pub const fn failing() -> Self {
            Self { body: None }
        }
    }

    #[async_trait]
    impl RoundTripper for StaticTransport {
        async fn round_trip(&self, _ctx: &Context, _req: Request<Bytes>) -> Result<Response<Bytes>> {
            let body = self.body.ok_or_else(|| {
                NetxError::failure(Failure::ConnectionReset, Operation::HttpRoundTrip)
            })?;
            Ok(Response::new(Bytes::from_static(body)))
        }
    }

    /// Answers 200 echoing the request headers
    pub struct EchoTransport;

    #[async_trait]
    impl RoundTripper for EchoTransport {
        async fn round_trip(&self, _ctx: &Context, req: Request<Bytes>) -> Result<Response<Bytes>> {
            let mut resp = Response::new(Bytes::new());
            *resp.headers_mut() = req.headers().clone();
            Ok(resp)
        }
    }
}
