//! `host:port` endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::error::NetxError;

/// A network endpoint: a hostname or IP literal plus a port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Create an endpoint. IPv6 literals must be passed without brackets.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Hostname or IP literal, without brackets
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port number
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// The host as an IP address, if it is a literal
    #[must_use]
    pub fn ip(&self) -> Option<IpAddr> {
        self.host.parse().ok()
    }

    /// The endpoint as a socket address, if the host is a literal
    #[must_use]
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.ip().map(|ip| SocketAddr::new(ip, self.port))
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = NetxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NetxError::InvalidEndpoint(s.to_string());
        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            (host, tail.strip_prefix(':').ok_or_else(invalid)?)
        } else {
            let (host, port) = s.rsplit_once(':').ok_or_else(invalid)?;
            if host.contains(':') {
                // unbracketed IPv6 literal
                return Err(invalid());
            }
            (host, port)
        };
        let port = port.parse().map_err(|_| invalid())?;
        Ok(Self::new(host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hostname() {
        let ep: Endpoint = "dot.dns:853".parse().unwrap();
        assert_eq!(ep.host(), "dot.dns");
        assert_eq!(ep.port(), 853);
        assert!(ep.ip().is_none());
        assert_eq!(ep.to_string(), "dot.dns:853");
    }

    #[test]
    fn test_parse_ipv6() {
        let ep: Endpoint = "[2001:4860:4860::8888]:443".parse().unwrap();
        assert_eq!(ep.host(), "2001:4860:4860::8888");
        assert_eq!(ep.to_string(), "[2001:4860:4860::8888]:443");
        assert_eq!(ep.socket_addr().unwrap().port(), 443);
    }

    #[test]
    fn test_missing_port() {
        for bad in ["antani.ooni.nu", "::1", "[::1]", "[::1]443", "host:http"] {
            assert!(bad.parse::<Endpoint>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_from_socket_addr() {
        let addr: SocketAddr = "[::1]:53".parse().unwrap();
        assert_eq!(Endpoint::from(addr).to_string(), "[::1]:53");
    }
}
