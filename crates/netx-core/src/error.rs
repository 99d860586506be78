use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::classify::classify;
use crate::failure::Failure;

/// Boxed foreign error, as produced by the libraries underneath the stack
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for netx operations
pub type Result<T> = std::result::Result<T, NetxError>;

/// The network operation during which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Hostname resolution
    Resolve,
    /// TCP connect, including proxy negotiation
    Connect,
    /// TLS handshake
    TlsHandshake,
    /// HTTP request/response exchange
    HttpRoundTrip,
}

impl Operation {
    /// Canonical name used in archival data
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Connect => "connect",
            Self::TlsHandshake => "tls_handshake",
            Self::HttpRoundTrip => "http_round_trip",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure that has been mapped onto the canonical taxonomy.
///
/// Displays as the bare canonical string so that two wrappers built from
/// different native errors compare equal once rendered.
#[derive(Error, Debug)]
#[error("{failure}")]
pub struct ErrWrapper {
    /// Canonical failure
    pub failure: Failure,
    /// Operation that failed
    pub operation: Operation,
    /// Dial correlation id, when the failure happened inside a tracked dial
    pub dial_id: Option<u64>,
    /// The native error this failure was derived from
    #[source]
    pub source: Option<BoxError>,
}

impl ErrWrapper {
    /// Create a wrapper with no underlying native error
    #[must_use]
    pub const fn new(failure: Failure, operation: Operation) -> Self {
        Self {
            failure,
            operation,
            dial_id: None,
            source: None,
        }
    }

    /// Attach the native error this failure was derived from
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Errors produced by the transport stack
#[derive(Error, Debug)]
pub enum NetxError {
    /// Classified failure
    #[error(transparent)]
    Failure(Box<ErrWrapper>),

    /// Raw I/O error not classified yet
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Raw error from a lower library not classified yet
    #[error(transparent)]
    Other(BoxError),

    /// Endpoint could not be parsed as `host:port`
    #[error("invalid endpoint {0:?}: missing port in address")]
    InvalidEndpoint(String),

    /// Network other than tcp, tcp4 or tcp6
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// Malformed or unsupported URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ErrWrapper> for NetxError {
    fn from(wrapper: ErrWrapper) -> Self {
        Self::Failure(Box::new(wrapper))
    }
}

impl NetxError {
    /// Wrap any foreign error
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Other(err.into())
    }

    /// Shorthand for a classified failure without a native source
    #[must_use]
    pub fn failure(failure: Failure, operation: Operation) -> Self {
        ErrWrapper::new(failure, operation).into()
    }

    /// Classified `generic_timeout_error`
    #[must_use]
    pub fn timeout(operation: Operation) -> Self {
        Self::failure(Failure::GenericTimeoutError, operation)
    }

    /// Classified `interrupted`
    #[must_use]
    pub fn interrupted(operation: Operation) -> Self {
        Self::failure(Failure::Interrupted, operation)
    }

    /// The canonical failure, if this error has been classified
    #[must_use]
    pub fn classified(&self) -> Option<&Failure> {
        match self {
            Self::Failure(wrapper) => Some(&wrapper.failure),
            _ => None,
        }
    }

    /// The failure this error maps to, classifying on the fly when needed
    #[must_use]
    pub fn to_failure(&self) -> Failure {
        self.classified().cloned().unwrap_or_else(|| classify(self))
    }

    /// Dial correlation id carried by a classified failure
    #[must_use]
    pub fn dial_id(&self) -> Option<u64> {
        match self {
            Self::Failure(wrapper) => wrapper.dial_id,
            _ => None,
        }
    }

    /// Replace a raw error with its classified form.
    ///
    /// Already classified errors are returned unchanged, so applying this
    /// twice is the same as applying it once.
    #[must_use]
    pub fn classify(self, operation: Operation) -> Self {
        if matches!(self, Self::Failure(_)) {
            return self;
        }
        let failure = classify(&self);
        ErrWrapper {
            failure,
            operation,
            dial_id: None,
            source: Some(Box::new(self)),
        }
        .into()
    }

    /// Stamp a dial id on a classified failure that does not carry one yet
    #[must_use]
    pub fn with_dial_id(mut self, dial_id: u64) -> Self {
        if let Self::Failure(wrapper) = &mut self {
            wrapper.dial_id.get_or_insert(dial_id);
        }
        self
    }
}
