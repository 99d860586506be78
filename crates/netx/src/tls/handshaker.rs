use async_trait::async_trait;
use netx_core::{Context, Event, EventKind, Logger, NetxError, Operation, Result};
use rustls::pki_types::ServerName;
use rustls::ClientConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_rustls::TlsConnector;

use super::TlsHandshaker;
use crate::dialer::BoxConn;

/// Handshake timeout
pub const DEFAULT_TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Leaf handshaker performing a rustls client handshake
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTlsHandshaker;

#[async_trait]
impl TlsHandshaker for SystemTlsHandshaker {
    async fn handshake(
        &self,
        ctx: &Context,
        conn: BoxConn,
        server_name: &str,
        config: Arc<ClientConfig>,
    ) -> Result<BoxConn> {
        let name = ServerName::try_from(server_name.to_string())
            .map_err(|e| NetxError::InvalidEndpoint(format!("{server_name}: {e}")))?;
        let connector = TlsConnector::from(config);
        let stream = ctx
            .run(Operation::TlsHandshake, async {
                Ok(connector.connect(name, conn).await?)
            })
            .await?;
        Ok(Box::new(stream))
    }
}

/// Bounds the handshake by a fixed timeout
#[derive(Debug, Clone)]
pub struct TimeoutTlsHandshaker<H> {
    handshaker: H,
    timeout: Duration,
}

impl<H> TimeoutTlsHandshaker<H> {
    /// Bound handshakes by [`DEFAULT_TLS_HANDSHAKE_TIMEOUT`]
    #[must_use]
    pub const fn new(handshaker: H) -> Self {
        Self::with_timeout(handshaker, DEFAULT_TLS_HANDSHAKE_TIMEOUT)
    }

    /// Bound handshakes by `timeout`
    #[must_use]
    pub const fn with_timeout(handshaker: H, timeout: Duration) -> Self {
        Self {
            handshaker,
            timeout,
        }
    }
}

#[async_trait]
impl<H: TlsHandshaker> TlsHandshaker for TimeoutTlsHandshaker<H> {
    async fn handshake(
        &self,
        ctx: &Context,
        conn: BoxConn,
        server_name: &str,
        config: Arc<ClientConfig>,
    ) -> Result<BoxConn> {
        tokio::time::timeout(
            self.timeout,
            self.handshaker.handshake(ctx, conn, server_name, config),
        )
        .await
        .map_err(|_| NetxError::timeout(Operation::TlsHandshake))?
    }
}

/// Classifies handshake errors with operation `tls_handshake`
#[derive(Debug, Clone)]
pub struct ErrorWrapperTlsHandshaker<H> {
    handshaker: H,
}

impl<H> ErrorWrapperTlsHandshaker<H> {
    /// Classify the failures of `handshaker`
    #[must_use]
    pub const fn new(handshaker: H) -> Self {
        Self { handshaker }
    }
}

#[async_trait]
impl<H: TlsHandshaker> TlsHandshaker for ErrorWrapperTlsHandshaker<H> {
    async fn handshake(
        &self,
        ctx: &Context,
        conn: BoxConn,
        server_name: &str,
        config: Arc<ClientConfig>,
    ) -> Result<BoxConn> {
        self.handshaker
            .handshake(ctx, conn, server_name, config)
            .await
            .map_err(|err| err.classify(Operation::TlsHandshake))
    }
}

/// Logs each handshake and its outcome
pub struct LoggingTlsHandshaker<H> {
    handshaker: H,
    logger: Arc<dyn Logger>,
}

impl<H> LoggingTlsHandshaker<H> {
    /// Log every handshake made through `handshaker`
    #[must_use]
    pub fn new(handshaker: H, logger: Arc<dyn Logger>) -> Self {
        Self { handshaker, logger }
    }
}

#[async_trait]
impl<H: TlsHandshaker> TlsHandshaker for LoggingTlsHandshaker<H> {
    async fn handshake(
        &self,
        ctx: &Context,
        conn: BoxConn,
        server_name: &str,
        config: Arc<ClientConfig>,
    ) -> Result<BoxConn> {
        let alpn: Vec<String> = config
            .alpn_protocols
            .iter()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .collect();
        self.logger
            .debug(&format!("tls {{sni={server_name} next={alpn:?}}}..."));
        let start = Instant::now();
        let result = self.handshaker.handshake(ctx, conn, server_name, config).await;
        let elapsed = start.elapsed();
        match &result {
            Ok(conn) => {
                let negotiated = negotiated_protocol(conn).unwrap_or_default();
                self.logger.debug(&format!(
                    "tls {{sni={server_name} next={alpn:?}}}... ok {negotiated:?} in {elapsed:?}"
                ));
            }
            Err(err) => self.logger.debug(&format!(
                "tls {{sni={server_name} next={alpn:?}}}... {err} in {elapsed:?}"
            )),
        }
        result
    }
}

/// Correlates each handshake with a fresh handshake id and records it
#[derive(Debug, Clone)]
pub struct EmitterTlsHandshaker<H> {
    handshaker: H,
}

impl<H> EmitterTlsHandshaker<H> {
    /// Record the handshakes made through `handshaker`
    #[must_use]
    pub const fn new(handshaker: H) -> Self {
        Self { handshaker }
    }
}

#[async_trait]
impl<H: TlsHandshaker> TlsHandshaker for EmitterTlsHandshaker<H> {
    async fn handshake(
        &self,
        ctx: &Context,
        conn: BoxConn,
        server_name: &str,
        config: Arc<ClientConfig>,
    ) -> Result<BoxConn> {
        let Some(root) = ctx.measurement_root() else {
            return self.handshaker.handshake(ctx, conn, server_name, config).await;
        };
        let handshake_id = root.next_handshake_id();
        let address = conn
            .remote_addr()
            .map_or_else(|| server_name.to_string(), |addr| addr.to_string());
        root.emit_start(EventKind::TlsHandshakeStart, handshake_id, "tcp", &address);

        let started = root.elapsed();
        let result = self.handshaker.handshake(ctx, conn, server_name, config).await;
        let t = root.elapsed();

        root.emit(Event {
            kind: EventKind::TlsHandshakeDone,
            correlation_id: handshake_id,
            network: "tcp".to_string(),
            address,
            addresses: Vec::new(),
            failure: result.as_ref().err().map(NetxError::to_failure),
            t,
            duration: Some(t.saturating_sub(started)),
            negotiated_protocol: result.as_ref().ok().and_then(negotiated_protocol),
        });
        result
    }
}

fn negotiated_protocol(conn: &BoxConn) -> Option<String> {
    conn.negotiated_protocol()
        .map(|p| String::from_utf8_lossy(&p).into_owned())
}
