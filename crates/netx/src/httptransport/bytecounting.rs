use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Request, Response};
use netx_core::{ByteCounter, Context, Result};
use std::sync::Arc;

use super::RoundTripper;

/// Counts the bytes of each request and response it forwards
pub struct ByteCountingTransport<T> {
    transport: T,
    counter: Arc<ByteCounter>,
}

impl<T> ByteCountingTransport<T> {
    /// Count the bytes exchanged by `transport` into `counter`
    #[must_use]
    pub const fn new(transport: T, counter: Arc<ByteCounter>) -> Self {
        Self { transport, counter }
    }
}

#[async_trait]
impl<T: RoundTripper> RoundTripper for ByteCountingTransport<T> {
    async fn round_trip(&self, ctx: &Context, req: Request<Bytes>) -> Result<Response<Bytes>> {
        self.counter.count_bytes_sent(request_size(&req));
        let resp = self.transport.round_trip(ctx, req).await?;
        self.counter.count_bytes_received(response_size(&resp));
        Ok(resp)
    }

    fn close_idle_connections(&self) {
        self.transport.close_idle_connections();
    }
}

fn headers_size(headers: &HeaderMap) -> usize {
    headers
        .iter()
        .map(|(name, value)| name.as_str().len() + ": ".len() + value.len() + "\r\n".len())
        .sum()
}

/// Size of the request in HTTP/1.1 framing
pub(crate) fn request_size(req: &Request<Bytes>) -> u64 {
    let line = req.method().as_str().len() + " ".len() + req.uri().to_string().len() + " HTTP/1.1\r\n".len();
    let size = line + headers_size(req.headers()) + "\r\n".len() + req.body().len();
    u64::try_from(size).unwrap_or(u64::MAX)
}

/// Size of the response in HTTP/1.1 framing
pub(crate) fn response_size(resp: &Response<Bytes>) -> u64 {
    let reason = resp.status().canonical_reason().unwrap_or_default();
    let line = "HTTP/1.1 ".len() + 3 + " ".len() + reason.len() + "\r\n".len();
    let size = line + headers_size(resp.headers()) + "\r\n".len() + resp.body().len();
    u64::try_from(size).unwrap_or(u64::MAX)
}
