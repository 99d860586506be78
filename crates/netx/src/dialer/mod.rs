//! Dialer chain.
//!
//! Each layer wraps a more primitive [`Dialer`]. The default chain built by
//! [`crate::httptransport::new_dialer`] is
//!
//! ```text
//! DnsDialer(Resolver, ProxyDialer(EmitterDialer(LoggingDialer(ErrorWrapperDialer(TimeoutDialer(SystemDialer))))))
//! ```
//!
//! so that the fallback loop sees one classified, timed-out, logged and
//! recorded attempt per resolved address.

mod dns;
mod emitter;
mod proxy;
mod system;
mod wrappers;

pub use dns::DnsDialer;
pub use emitter::EmitterDialer;
pub use proxy::ProxyDialer;
pub use system::SystemDialer;
pub use wrappers::{ErrorWrapperDialer, LoggingDialer, TimeoutDialer, DEFAULT_DIAL_TIMEOUT};

use async_trait::async_trait;
use netx_core::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::TcpStream;

/// An established byte stream
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin {
    /// Address of the remote peer, when known
    fn remote_addr(&self) -> Option<SocketAddr>;

    /// ALPN protocol negotiated on this connection, if any
    fn negotiated_protocol(&self) -> Option<Vec<u8>> {
        None
    }
}

/// Owned, type-erased connection
pub type BoxConn = Box<dyn Connection>;

impl Connection for TcpStream {
    fn remote_addr(&self) -> Option<SocketAddr> {
        self.peer_addr().ok()
    }
}

impl Connection for DuplexStream {
    fn remote_addr(&self) -> Option<SocketAddr> {
        None
    }
}

impl Connection for tokio_rustls::client::TlsStream<BoxConn> {
    fn remote_addr(&self) -> Option<SocketAddr> {
        self.get_ref().0.remote_addr()
    }

    fn negotiated_protocol(&self) -> Option<Vec<u8>> {
        self.get_ref().1.alpn_protocol().map(<[u8]>::to_vec)
    }
}

/// Establishes connections to `address` over `network`.
///
/// `network` is one of `tcp`, `tcp4` or `tcp6`; `address` is `host:port`.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Connect to `address`; the caller owns the returned connection
    async fn dial(&self, ctx: &Context, network: &str, address: &str) -> Result<BoxConn>;
}

#[async_trait]
impl<T: Dialer + ?Sized> Dialer for Arc<T> {
    async fn dial(&self, ctx: &Context, network: &str, address: &str) -> Result<BoxConn> {
        (**self).dial(ctx, network, address).await
    }
}

#[async_trait]
impl<T: Dialer + ?Sized> Dialer for Box<T> {
    async fn dial(&self, ctx: &Context, network: &str, address: &str) -> Result<BoxConn> {
        (**self).dial(ctx, network, address).await
    }
}
