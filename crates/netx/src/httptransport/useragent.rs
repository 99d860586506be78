use async_trait::async_trait;
use bytes::Bytes;
use http::header::USER_AGENT;
use http::{HeaderValue, Request, Response};
use netx_core::{Context, Result};

use super::RoundTripper;
use crate::headers::DEFAULT_USER_AGENT;

/// Sets the default `User-Agent` when the caller did not set one
pub struct UserAgentTransport<T> {
    transport: T,
}

impl<T> UserAgentTransport<T> {
    /// Add the default `User-Agent` to requests sent through `transport`
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: RoundTripper> RoundTripper for UserAgentTransport<T> {
    async fn round_trip(&self, ctx: &Context, mut req: Request<Bytes>) -> Result<Response<Bytes>> {
        req.headers_mut()
            .entry(USER_AGENT)
            .or_insert(HeaderValue::from_static(DEFAULT_USER_AGENT));
        self.transport.round_trip(ctx, req).await
    }

    fn close_idle_connections(&self) {
        self.transport.close_idle_connections();
    }
}
