//! Default request headers.

use bytes::Bytes;
use http::header::{ACCEPT, ACCEPT_LANGUAGE};
use http::{Method, Request};
use netx_core::{NetxError, Result};

/// `User-Agent` set on requests that do not carry one
pub const DEFAULT_USER_AGENT: &str = concat!("netprobe/", env!("CARGO_PKG_VERSION"));

/// `Accept` value of a typical browser
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// `Accept-Language` value of a typical browser
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US;q=0.8,en;q=0.5";

/// Build a request carrying the default `Accept` and `Accept-Language`
/// headers. `User-Agent` is left to the transport.
pub fn new_request(method: Method, url: &str, body: Bytes) -> Result<Request<Bytes>> {
    Request::builder()
        .method(method)
        .uri(url)
        .header(ACCEPT, DEFAULT_ACCEPT)
        .header(ACCEPT_LANGUAGE, DEFAULT_ACCEPT_LANGUAGE)
        .body(body)
        .map_err(|e| NetxError::InvalidUrl(format!("{url}: {e}")))
}
