use async_trait::async_trait;
use netx_core::{Context, Endpoint, Result};
use rustls::ClientConfig;
use std::sync::Arc;

use super::{TlsDialer, TlsHandshaker};
use crate::dialer::{BoxConn, Dialer};

/// Dials TCP through a [`Dialer`] then hands the connection to a
/// [`TlsHandshaker`].
///
/// The SNI is the endpoint host unless an override is configured.
pub struct TlsHandshakeDialer<D, H> {
    dialer: D,
    handshaker: H,
    config: Arc<ClientConfig>,
    server_name: Option<String>,
}

impl<D, H> TlsHandshakeDialer<D, H> {
    /// Dial with `dialer`, then handshake with `handshaker` using `config`
    #[must_use]
    pub const fn new(dialer: D, handshaker: H, config: Arc<ClientConfig>) -> Self {
        Self {
            dialer,
            handshaker,
            config,
            server_name: None,
        }
    }

    /// Use a fixed SNI instead of the endpoint host
    #[must_use]
    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }
}

#[async_trait]
impl<D: Dialer, H: TlsHandshaker> TlsDialer for TlsHandshakeDialer<D, H> {
    async fn dial_tls(&self, ctx: &Context, network: &str, address: &str) -> Result<BoxConn> {
        let endpoint: Endpoint = address.parse()?;
        let conn = self.dialer.dial(ctx, network, address).await?;
        let server_name = self.server_name.as_deref().unwrap_or(endpoint.host());
        self.handshaker
            .handshake(ctx, conn, server_name, Arc::clone(&self.config))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialer::{EmitterDialer, SystemDialer};
    use crate::mocks::EofDialer;
    use crate::tls::testing::garbage_server;
    use crate::tls::{default_tls_config, EmitterTlsHandshaker, ErrorWrapperTlsHandshaker, SystemTlsHandshaker};
    use netx_core::{EventKind, Failure, MeasurementRoot, NetxError, SavingHandler};

    #[tokio::test]
    async fn test_missing_port() {
        let dialer = TlsHandshakeDialer::new(
            EofDialer,
            SystemTlsHandshaker,
            default_tls_config().unwrap(),
        );
        let err = dialer
            .dial_tls(&Context::new(), "tcp", "example.com")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, NetxError::InvalidEndpoint(_)));
    }

    #[tokio::test]
    async fn test_dial_failure_skips_handshake() {
        let saver = Arc::new(SavingHandler::new());
        let ctx = Context::new().with_measurement_root(Arc::new(MeasurementRoot::new(saver.clone())));
        let dialer = TlsHandshakeDialer::new(
            EofDialer,
            EmitterTlsHandshaker::new(SystemTlsHandshaker),
            default_tls_config().unwrap(),
        );
        assert!(dialer.dial_tls(&ctx, "tcp", "example.com:443").await.is_err());
        assert!(saver.read().is_empty());
    }

    #[tokio::test]
    async fn test_dial_then_handshake_events() {
        let (addr, server) = garbage_server().await;
        let saver = Arc::new(SavingHandler::new());
        let ctx = Context::new().with_measurement_root(Arc::new(MeasurementRoot::new(saver.clone())));
        let dialer = TlsHandshakeDialer::new(
            EmitterDialer::new(SystemDialer),
            EmitterTlsHandshaker::new(ErrorWrapperTlsHandshaker::new(SystemTlsHandshaker)),
            default_tls_config().unwrap(),
        )
        .with_server_name("example.com");
        let err = dialer.dial_tls(&ctx, "tcp", &addr).await.err().unwrap();
        assert_eq!(err.classified(), Some(&Failure::TlsHandshakeFailure));
        server.await.unwrap();

        let kinds: Vec<_> = saver.read().into_iter().map(|ev| ev.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::DialStart,
                EventKind::Connect,
                EventKind::TlsHandshakeStart,
                EventKind::TlsHandshakeDone,
            ]
        );
    }
}
