//! TLS handshaker chain and the TLS dialer.
//!
//! The default handshaker is
//! `EmitterTlsHandshaker(LoggingTlsHandshaker(ErrorWrapperTlsHandshaker(TimeoutTlsHandshaker(SystemTlsHandshaker))))`,
//! the logging layer present only when a logger is configured.

mod dialer;
mod handshaker;

pub use dialer::TlsHandshakeDialer;
pub use handshaker::{
    EmitterTlsHandshaker, ErrorWrapperTlsHandshaker, LoggingTlsHandshaker, SystemTlsHandshaker,
    TimeoutTlsHandshaker, DEFAULT_TLS_HANDSHAKE_TIMEOUT,
};

use async_trait::async_trait;
use netx_core::{Context, NetxError, Result};
use rustls::{ClientConfig, RootCertStore};
use std::sync::Arc;

use crate::dialer::BoxConn;

/// ALPN protocols offered by default, in preference order
pub const DEFAULT_NEXT_PROTOS: [&str; 2] = ["h2", "http/1.1"];

/// Upgrades an established connection to TLS.
///
/// The connection is consumed: on failure it is dropped, which closes it.
#[async_trait]
pub trait TlsHandshaker: Send + Sync {
    /// Handshake over `conn`, verifying the peer against `server_name`
    async fn handshake(
        &self,
        ctx: &Context,
        conn: BoxConn,
        server_name: &str,
        config: Arc<ClientConfig>,
    ) -> Result<BoxConn>;
}

#[async_trait]
impl<T: TlsHandshaker + ?Sized> TlsHandshaker for Arc<T> {
    async fn handshake(
        &self,
        ctx: &Context,
        conn: BoxConn,
        server_name: &str,
        config: Arc<ClientConfig>,
    ) -> Result<BoxConn> {
        (**self).handshake(ctx, conn, server_name, config).await
    }
}

/// Dials TLS connections
#[async_trait]
pub trait TlsDialer: Send + Sync {
    /// Dial `address` and complete a TLS handshake with the endpoint host
    async fn dial_tls(&self, ctx: &Context, network: &str, address: &str) -> Result<BoxConn>;
}

#[async_trait]
impl<T: TlsDialer + ?Sized> TlsDialer for Arc<T> {
    async fn dial_tls(&self, ctx: &Context, network: &str, address: &str) -> Result<BoxConn> {
        (**self).dial_tls(ctx, network, address).await
    }
}

/// Client configuration with the webpki roots offering `h2` then `http/1.1`
pub fn default_tls_config() -> Result<Arc<ClientConfig>> {
    tls_config_with_alpn(&DEFAULT_NEXT_PROTOS)
}

/// Client configuration with the webpki roots and the given ALPN protocols
pub fn tls_config_with_alpn<S: AsRef<str>>(next_protos: &[S]) -> Result<Arc<ClientConfig>> {
    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| NetxError::Config(format!("TLS configuration: {e}")))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = next_protos
        .iter()
        .map(|p| p.as_ref().as_bytes().to_vec())
        .collect();
    Ok(Arc::new(config))
}
