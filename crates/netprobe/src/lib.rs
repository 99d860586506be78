//! Instrumented transport layer for network measurement.
//!
//! Resolves, dials, handshakes and fetches while recording every low-level
//! event with a correlation id, and maps every failure onto a canonical
//! taxonomy so that results from different vantage points compare.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use netprobe::{archival, httptransport, headers, Config, Context, MeasurementRoot, RoundTripper, SavingHandler};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> netprobe::Result<()> {
//!     let saver = Arc::new(SavingHandler::new());
//!     let root = Arc::new(MeasurementRoot::new(saver.clone()));
//!     let ctx = Context::new().with_measurement_root(root);
//!
//!     let txp = httptransport::new(Config::default())?;
//!     let req = headers::new_request(netprobe::http::Method::GET, "https://example.com/", Default::default())?;
//!     match txp.round_trip(&ctx, req).await {
//!         Ok(resp) => println!("status: {}", resp.status()),
//!         Err(err) => println!("failure: {err}"),
//!     }
//!
//!     let events = saver.read();
//!     let queries = archival::new_dns_queries_list(&events);
//!     let tcp_connect = archival::new_tcp_connect_list(&events);
//!     println!("{}", serde_json::to_string_pretty(&queries).unwrap());
//!     println!("{}", serde_json::to_string_pretty(&tcp_connect).unwrap());
//!     Ok(())
//! }
//! ```
//!
//! # Crates
//!
//! - `netx-core` - failures, classification, context, events, archival
//! - `netx` - resolver, dialer, TLS and HTTP transport chains

// Re-export core types
pub use netx_core::*;

// Re-export the transport chains
pub use netx::{
    config, dialer, headers, httptransport, resolver, tls, BoxConn, Config, Connection, Dialer,
    ResolverKind, Resolver, RoundTripper, Settings, TlsDialer, TlsHandshaker,
};
pub use netx::{bytes, http};

// Re-export runtime for convenience
pub use serde;
pub use serde_json;
pub use tokio;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facade_reexports() {
        let reduced = reduce_errors(vec![
            NetxError::other("mocked error"),
            NetxError::failure(Failure::DnsBogonError, Operation::Resolve),
        ]);
        assert_eq!(reduced.unwrap().to_string(), FAILURE_DNS_BOGON_ERROR);
        assert!(headers::DEFAULT_USER_AGENT.starts_with("netprobe/"));
    }

    #[test]
    fn test_transport_builds() {
        tokio_test::block_on(async {
            let txp = httptransport::new(Config::default()).unwrap();
            txp.close_idle_connections();
        });
    }
}
