//! Canonical failure taxonomy.
//!
//! Measurements taken from different vantage points are compared by their
//! failure strings, so every native error converges onto one of these.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection refused by the peer
pub const FAILURE_CONNECTION_REFUSED: &str = "connection_refused";
/// Connection reset or aborted
pub const FAILURE_CONNECTION_RESET: &str = "connection_reset";
/// Unexpected end of stream
pub const FAILURE_EOF_ERROR: &str = "eof_error";
/// No route to the host
pub const FAILURE_HOST_UNREACHABLE: &str = "host_unreachable";
/// No route to the network
pub const FAILURE_NETWORK_UNREACHABLE: &str = "network_unreachable";
/// The name does not exist
pub const FAILURE_DNS_NXDOMAIN_ERROR: &str = "dns_nxdomain_error";
/// The answer contained a bogon address
pub const FAILURE_DNS_BOGON_ERROR: &str = "dns_bogon_error";
/// The answer contained no addresses
pub const FAILURE_DNS_NO_ANSWER: &str = "dns_no_answer";
/// Any timeout
pub const FAILURE_GENERIC_TIMEOUT_ERROR: &str = "generic_timeout_error";
/// The operation was cancelled by the caller
pub const FAILURE_INTERRUPTED: &str = "interrupted";
/// TLS handshake failed for a reason other than the certificate
pub const FAILURE_TLS_HANDSHAKE_FAILURE: &str = "tls_handshake_failure";
/// Certificate is not valid for the requested name
pub const FAILURE_SSL_INVALID_HOSTNAME: &str = "ssl_invalid_hostname";
/// Certificate chains to an unknown root
pub const FAILURE_SSL_UNKNOWN_AUTHORITY: &str = "ssl_unknown_authority";
/// Certificate is invalid for another reason (expired, malformed, ...)
pub const FAILURE_SSL_INVALID_CERTIFICATE: &str = "ssl_invalid_certificate";
/// Prefix of the fallback failure
pub const FAILURE_UNKNOWN_PREFIX: &str = "unknown_failure";

/// A canonical failure.
///
/// `Display` renders the canonical string and `From<&str>` parses it back,
/// so parsing a rendered failure always yields the same failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Failure {
    ConnectionRefused,
    ConnectionReset,
    EofError,
    HostUnreachable,
    NetworkUnreachable,
    DnsNxdomainError,
    DnsBogonError,
    DnsNoAnswer,
    GenericTimeoutError,
    Interrupted,
    TlsHandshakeFailure,
    SslInvalidHostname,
    SslUnknownAuthority,
    SslInvalidCertificate,
    /// Fallback carrying the original error message
    Unknown(String),
}

impl Failure {
    /// Canonical string of a recognized failure, `None` for the fallback
    #[must_use]
    pub const fn as_canonical(&self) -> Option<&'static str> {
        Some(match self {
            Self::ConnectionRefused => FAILURE_CONNECTION_REFUSED,
            Self::ConnectionReset => FAILURE_CONNECTION_RESET,
            Self::EofError => FAILURE_EOF_ERROR,
            Self::HostUnreachable => FAILURE_HOST_UNREACHABLE,
            Self::NetworkUnreachable => FAILURE_NETWORK_UNREACHABLE,
            Self::DnsNxdomainError => FAILURE_DNS_NXDOMAIN_ERROR,
            Self::DnsBogonError => FAILURE_DNS_BOGON_ERROR,
            Self::DnsNoAnswer => FAILURE_DNS_NO_ANSWER,
            Self::GenericTimeoutError => FAILURE_GENERIC_TIMEOUT_ERROR,
            Self::Interrupted => FAILURE_INTERRUPTED,
            Self::TlsHandshakeFailure => FAILURE_TLS_HANDSHAKE_FAILURE,
            Self::SslInvalidHostname => FAILURE_SSL_INVALID_HOSTNAME,
            Self::SslUnknownAuthority => FAILURE_SSL_UNKNOWN_AUTHORITY,
            Self::SslInvalidCertificate => FAILURE_SSL_INVALID_CERTIFICATE,
            Self::Unknown(_) => return None,
        })
    }

    /// True for every member of the taxonomy except the fallback
    #[must_use]
    pub const fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Build the fallback failure from an error message
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown(message.into())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(message) => write!(f, "{FAILURE_UNKNOWN_PREFIX}: {message}"),
            other => f.write_str(other.as_canonical().unwrap_or(FAILURE_UNKNOWN_PREFIX)),
        }
    }
}

impl From<&str> for Failure {
    fn from(s: &str) -> Self {
        match s {
            FAILURE_CONNECTION_REFUSED => Self::ConnectionRefused,
            FAILURE_CONNECTION_RESET => Self::ConnectionReset,
            FAILURE_EOF_ERROR => Self::EofError,
            FAILURE_HOST_UNREACHABLE => Self::HostUnreachable,
            FAILURE_NETWORK_UNREACHABLE => Self::NetworkUnreachable,
            FAILURE_DNS_NXDOMAIN_ERROR => Self::DnsNxdomainError,
            FAILURE_DNS_BOGON_ERROR => Self::DnsBogonError,
            FAILURE_DNS_NO_ANSWER => Self::DnsNoAnswer,
            FAILURE_GENERIC_TIMEOUT_ERROR => Self::GenericTimeoutError,
            FAILURE_INTERRUPTED => Self::Interrupted,
            FAILURE_TLS_HANDSHAKE_FAILURE => Self::TlsHandshakeFailure,
            FAILURE_SSL_INVALID_HOSTNAME => Self::SslInvalidHostname,
            FAILURE_SSL_UNKNOWN_AUTHORITY => Self::SslUnknownAuthority,
            FAILURE_SSL_INVALID_CERTIFICATE => Self::SslInvalidCertificate,
            other => {
                let message = other
                    .strip_prefix(FAILURE_UNKNOWN_PREFIX)
                    .and_then(|rest| rest.strip_prefix(": "))
                    .unwrap_or(other);
                Self::Unknown(message.to_string())
            }
        }
    }
}

impl From<String> for Failure {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Failure> for String {
    fn from(failure: Failure) -> Self {
        failure.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Failure; 14] = [
        Failure::ConnectionRefused,
        Failure::ConnectionReset,
        Failure::EofError,
        Failure::HostUnreachable,
        Failure::NetworkUnreachable,
        Failure::DnsNxdomainError,
        Failure::DnsBogonError,
        Failure::DnsNoAnswer,
        Failure::GenericTimeoutError,
        Failure::Interrupted,
        Failure::TlsHandshakeFailure,
        Failure::SslInvalidHostname,
        Failure::SslUnknownAuthority,
        Failure::SslInvalidCertificate,
    ];

    #[test]
    fn test_reparsing_is_identity() {
        for failure in ALL {
            let rendered = failure.to_string();
            assert_eq!(Failure::from(rendered.as_str()), failure);
            assert_eq!(Failure::from(rendered.as_str()).to_string(), rendered);
        }

        let unknown = Failure::unknown("mocked error");
        assert_eq!(unknown.to_string(), "unknown_failure: mocked error");
        assert_eq!(Failure::from(unknown.to_string()), unknown);
    }

    #[test]
    fn test_non_canonical_string_becomes_unknown() {
        let failure = Failure::from("antani");
        assert_eq!(failure, Failure::Unknown("antani".into()));
        assert!(!failure.is_recognized());
        assert_eq!(Failure::from(failure.to_string()), failure);
    }

    #[test]
    fn test_recognized() {
        assert!(ALL.iter().all(Failure::is_recognized));
        assert_eq!(Failure::unknown("x").as_canonical(), None);
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Failure::DnsBogonError).unwrap();
        assert_eq!(json, "\"dns_bogon_error\"");

        let parsed: Failure = serde_json::from_str("\"unknown_failure: boom\"").unwrap();
        assert_eq!(parsed, Failure::Unknown("boom".into()));
    }
}
