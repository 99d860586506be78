use async_trait::async_trait;
use bytes::Bytes;
use http::header::HOST;
use http::uri::PathAndQuery;
use http::{HeaderValue, Request, Response, Uri, Version};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::{http1, http2};
use hyper_util::rt::{TokioExecutor, TokioIo};
use netx_core::{Context, Endpoint, NetxError, Operation, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use super::RoundTripper;
use crate::dialer::{BoxConn, Dialer};
use crate::tls::TlsDialer;

/// Where a request goes
struct Target {
    tls: bool,
    endpoint: Endpoint,
    /// `scheme://authority`, the idle pool key
    key: String,
    host_header: String,
}

impl Target {
    fn from_uri(uri: &Uri) -> Result<Self> {
        let scheme = uri
            .scheme_str()
            .ok_or_else(|| NetxError::InvalidUrl(format!("missing scheme: {uri}")))?;
        let tls = match scheme {
            "https" => true,
            "http" => false,
            other => return Err(NetxError::InvalidUrl(format!("unsupported scheme: {other}"))),
        };
        let authority = uri
            .authority()
            .ok_or_else(|| NetxError::InvalidUrl(format!("missing host: {uri}")))?;
        let host = authority.host();
        let port = authority.port_u16().unwrap_or(if tls { 443 } else { 80 });
        let host_header = authority
            .port()
            .map_or_else(|| host.to_string(), |p| format!("{host}:{p}"));
        Ok(Self {
            tls,
            endpoint: Endpoint::new(host.trim_start_matches('[').trim_end_matches(']'), port),
            key: format!("{scheme}://{host_header}"),
            host_header,
        })
    }
}

enum Sender {
    Http1(http1::SendRequest<Full<Bytes>>),
    Http2(http2::SendRequest<Full<Bytes>>),
}

impl Sender {
    fn is_closed(&self) -> bool {
        match self {
            Self::Http1(s) => s.is_closed(),
            Self::Http2(s) => s.is_closed(),
        }
    }

    const fn is_http2(&self) -> bool {
        matches!(self, Self::Http2(_))
    }

    async fn send(&mut self, req: Request<Full<Bytes>>) -> Result<Response<Incoming>> {
        match self {
            Self::Http1(s) => {
                s.ready().await.map_err(NetxError::other)?;
                s.send_request(req).await.map_err(NetxError::other)
            }
            Self::Http2(s) => {
                s.ready().await.map_err(NetxError::other)?;
                s.send_request(req).await.map_err(NetxError::other)
            }
        }
    }
}

/// Raw HTTP transport over the configured dialers.
///
/// Speaks HTTP/2 when ALPN negotiated `h2` and HTTP/1.1 otherwise. Idle
/// connections are pooled per `scheme://authority`.
pub struct SystemTransport {
    dialer: Arc<dyn Dialer>,
    tls_dialer: Arc<dyn TlsDialer>,
    idle: Mutex<HashMap<String, Vec<Sender>>>,
}

impl SystemTransport {
    /// Plain connections come from `dialer`, TLS ones from `tls_dialer`
    #[must_use]
    pub fn new(dialer: Arc<dyn Dialer>, tls_dialer: Arc<dyn TlsDialer>) -> Self {
        Self {
            dialer,
            tls_dialer,
            idle: Mutex::new(HashMap::new()),
        }
    }

    /// Number of idle connections currently pooled
    pub fn idle_connections(&self) -> usize {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    fn take_idle(&self, key: &str) -> Option<Sender> {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        let senders = idle.get_mut(key)?;
        while let Some(sender) = senders.pop() {
            if !sender.is_closed() {
                return Some(sender);
            }
        }
        None
    }

    fn put_idle(&self, key: String, sender: Sender) {
        if sender.is_closed() {
            return;
        }
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .push(sender);
    }

    async fn connect(&self, ctx: &Context, target: &Target) -> Result<Sender> {
        let address = target.endpoint.to_string();
        let conn: BoxConn = if target.tls {
            self.tls_dialer.dial_tls(ctx, "tcp", &address).await?
        } else {
            self.dialer.dial(ctx, "tcp", &address).await?
        };
        let h2 = conn.negotiated_protocol().is_some_and(|p| p == b"h2");
        let io = TokioIo::new(conn);

        if h2 {
            let (sender, connection) = ctx
                .run(Operation::HttpRoundTrip, async {
                    http2::handshake(TokioExecutor::new(), io)
                        .await
                        .map_err(NetxError::other)
                })
                .await?;
            tokio::spawn(async move {
                if let Err(err) = connection.await {
                    debug!(error = %err, "http2 connection closed");
                }
            });
            Ok(Sender::Http2(sender))
        } else {
            let (sender, connection) = ctx
                .run(Operation::HttpRoundTrip, async {
                    http1::handshake(io).await.map_err(NetxError::other)
                })
                .await?;
            tokio::spawn(async move {
                if let Err(err) = connection.await {
                    debug!(error = %err, "http1 connection closed");
                }
            });
            Ok(Sender::Http1(sender))
        }
    }

    /// Send on a fresh connection
    async fn exchange_fresh(
        &self,
        ctx: &Context,
        target: &Target,
        req: Request<Bytes>,
    ) -> Result<(Sender, Response<Incoming>)> {
        let mut sender = self.connect(ctx, target).await?;
        let http2 = sender.is_http2();
        let response = sender.send(prepare(req, target, http2)?).await?;
        Ok((sender, response))
    }

    /// Send on an idle pooled connection when there is one.
    ///
    /// The peer may have closed a pooled connection while it sat idle. If
    /// it fails before any response arrives, the request goes out once more
    /// on a fresh connection.
    async fn exchange(
        &self,
        ctx: &Context,
        target: &Target,
        req: Request<Bytes>,
    ) -> Result<(Sender, Response<Incoming>)> {
        let Some(mut sender) = self.take_idle(&target.key) else {
            return self.exchange_fresh(ctx, target, req).await;
        };
        let retry = duplicate(&req);
        let http2 = sender.is_http2();
        match sender.send(prepare(req, target, http2)?).await {
            Ok(response) => Ok((sender, response)),
            Err(err) => {
                debug!(key = %target.key, error = %err, "idle connection failed, redialing");
                self.exchange_fresh(ctx, target, retry).await
            }
        }
    }

    async fn do_round_trip(&self, ctx: &Context, req: Request<Bytes>) -> Result<Response<Bytes>> {
        let target = Target::from_uri(req.uri())?;
        let (sender, response) = ctx
            .run(Operation::HttpRoundTrip, self.exchange(ctx, &target, req))
            .await?;
        let (parts, body) = response.into_parts();
        let body = ctx
            .run(Operation::HttpRoundTrip, async {
                Ok(body.collect().await.map_err(NetxError::other)?.to_bytes())
            })
            .await?;
        self.put_idle(target.key, sender);
        Ok(Response::from_parts(parts, body))
    }
}

/// Copy of a request for a second attempt; extensions are not carried over
fn duplicate(req: &Request<Bytes>) -> Request<Bytes> {
    let mut copy = Request::new(req.body().clone());
    *copy.method_mut() = req.method().clone();
    *copy.uri_mut() = req.uri().clone();
    *copy.version_mut() = req.version();
    *copy.headers_mut() = req.headers().clone();
    copy
}

/// Adapt the request to the wire protocol of the connection
fn prepare(req: Request<Bytes>, target: &Target, http2: bool) -> Result<Request<Full<Bytes>>> {
    let (mut parts, body) = req.into_parts();
    if http2 {
        parts.version = Version::HTTP_2;
    } else {
        parts.version = Version::HTTP_11;
        if !parts.headers.contains_key(HOST) {
            let host = HeaderValue::from_str(&target.host_header)
                .map_err(|e| NetxError::InvalidUrl(e.to_string()))?;
            parts.headers.insert(HOST, host);
        }
        let path = parts
            .uri
            .path_and_query()
            .map_or("/", PathAndQuery::as_str)
            .to_string();
        parts.uri = Uri::try_from(path).map_err(|e| NetxError::InvalidUrl(e.to_string()))?;
    }
    Ok(Request::from_parts(parts, Full::new(body)))
}

#[async_trait]
impl RoundTripper for SystemTransport {
    async fn round_trip(&self, ctx: &Context, req: Request<Bytes>) -> Result<Response<Bytes>> {
        self.do_round_trip(ctx, req)
            .await
            .map_err(|err| err.classify(Operation::HttpRoundTrip))
    }

    fn close_idle_connections(&self) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
