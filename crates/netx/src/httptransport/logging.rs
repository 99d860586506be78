use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use netx_core::{Context, Logger, Result};
use std::sync::Arc;

use super::RoundTripper;

/// Logs each request and response, headers included
pub struct LoggingTransport<T> {
    transport: T,
    logger: Arc<dyn Logger>,
}

impl<T> LoggingTransport<T> {
    /// Log requests and responses going through `transport`
    #[must_use]
    pub fn new(transport: T, logger: Arc<dyn Logger>) -> Self {
        Self { transport, logger }
    }
}

#[async_trait]
impl<T: RoundTripper> RoundTripper for LoggingTransport<T> {
    async fn round_trip(&self, ctx: &Context, req: Request<Bytes>) -> Result<Response<Bytes>> {
        self.logger
            .debug(&format!("> {} {}", req.method(), req.uri()));
        for (name, value) in req.headers() {
            self.logger.debug(&format!(
                "> {name}: {}",
                String::from_utf8_lossy(value.as_bytes())
            ));
        }
        self.logger.debug(">");

        let result = self.transport.round_trip(ctx, req).await;
        match &result {
            Ok(resp) => {
                self.logger.debug(&format!("< {}", resp.status().as_u16()));
                for (name, value) in resp.headers() {
                    self.logger.debug(&format!(
                        "< {name}: {}",
                        String::from_utf8_lossy(value.as_bytes())
                    ));
                }
                self.logger.debug("<");
            }
            Err(err) => self.logger.debug(&format!("< {err}")),
        }
        result
    }

    fn close_idle_connections(&self) {
        self.transport.close_idle_connections();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::httptransport::testing::StaticTransport;
    use netx_core::SavingLogger;

    #[tokio::test]
    async fn test_logs_request_and_response() {
        let logger = Arc::new(SavingLogger::new());
        let txp = LoggingTransport::new(StaticTransport::ok(b""), logger.clone());
        let req = Request::get("http://x.org/")
            .header("accept", "*/*")
            .body(Bytes::new())
            .unwrap();
        txp.round_trip(&Context::new(), req).await.unwrap();
        assert_eq!(
            logger.lines(),
            vec!["> GET http://x.org/", "> accept: */*", ">", "< 200", "<"]
        );
    }

    #[tokio::test]
    async fn test_logs_failure() {
        let logger = Arc::new(SavingLogger::new());
        let txp = LoggingTransport::new(StaticTransport::failing(), logger.clone());
        let req = Request::get("http://x.org/").body(Bytes::new()).unwrap();
        assert!(txp.round_trip(&Context::new(), req).await.is_err());
        assert_eq!(logger.lines().last().unwrap(), "< connection_reset");
    }
}
