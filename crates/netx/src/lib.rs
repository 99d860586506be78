//! Instrumented network transport for measurement.
//!
//! This crate composes the resolver, dialer, TLS and HTTP layers:
//!
//! - [`resolver`]: system/hickory resolution with bogon detection
//! - [`dialer`]: TCP dialing with per-address fallback, proxying and events
//! - [`tls`]: TLS handshakes and the TLS dialer
//! - [`httptransport`]: the assembled [`RoundTripper`]
//!
//! # Example
//!
//! ```rust,no_run
//! use netx::{httptransport, headers, Config, RoundTripper};
//! use netx_core::{Context, MeasurementRoot, SavingHandler};
//! use std::sync::Arc;
//!
//! # async fn example() -> netx_core::Result<()> {
//! let saver = Arc::new(SavingHandler::new());
//! let ctx = Context::new().with_measurement_root(Arc::new(MeasurementRoot::new(saver.clone())));
//!
//! let txp = httptransport::new(Config::default())?;
//! let req = headers::new_request(http::Method::GET, "https://example.com/", Default::default())?;
//! let resp = txp.round_trip(&ctx, req).await?;
//! println!("{} ({} events)", resp.status(), saver.read().len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dialer;
pub mod headers;
pub mod httptransport;
pub mod resolver;
pub mod tls;

#[cfg(test)]
mod mocks;

pub use config::{Config, ResolverKind, Settings};
pub use dialer::{BoxConn, Connection, Dialer};
pub use httptransport::RoundTripper;
pub use netx_core::{NetxError, Result};
pub use resolver::Resolver;
pub use tls::{TlsDialer, TlsHandshaker};

// Re-export the HTTP types used in the public API
pub use bytes;
pub use http;
