//! Mapping from native errors onto the canonical failure taxonomy.

use rustls::CertificateError;
use std::error::Error as StdError;
use std::io;

use crate::error::{ErrWrapper, NetxError};
use crate::failure::{Failure, FAILURE_UNKNOWN_PREFIX};

/// Messages produced by resolvers when a name does not exist.
const NXDOMAIN_MESSAGES: [&str; 7] = [
    "no such host",
    "nxdomain",
    "no record found",
    "no records found",
    "name or service not known",
    "nodename nor servname provided",
    "no address associated with hostname",
];

/// Classify any error into a canonical failure.
///
/// Walks the source chain and returns the first recognized condition. An
/// error that is already classified maps to its own failure. Errors that
/// match nothing become `unknown_failure: <message>` using the outermost
/// message.
pub fn classify(err: &(dyn StdError + 'static)) -> Failure {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(failure) = classify_one(e) {
            return failure;
        }
        current = next_source(e);
    }
    Failure::unknown(err.to_string())
}

fn classify_one(err: &(dyn StdError + 'static)) -> Option<Failure> {
    if let Some(wrapper) = err.downcast_ref::<ErrWrapper>() {
        return Some(wrapper.failure.clone());
    }
    if let Some(netx) = err.downcast_ref::<NetxError>() {
        if let Some(failure) = netx.classified() {
            return Some(failure.clone());
        }
    }
    if let Some(io_err) = err.downcast_ref::<io::Error>() {
        if let Some(failure) = classify_io(io_err) {
            return Some(failure);
        }
    }
    if let Some(tls_err) = err.downcast_ref::<rustls::Error>() {
        return Some(classify_tls(tls_err));
    }
    if err.downcast_ref::<tokio::time::error::Elapsed>().is_some() {
        return Some(Failure::GenericTimeoutError);
    }
    classify_message(&err.to_string())
}

/// `io::Error` and the transparent `NetxError` variants hide their inner
/// error from `source()`, so step into them explicitly.
fn next_source<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a (dyn StdError + 'static)> {
    if let Some(netx) = err.downcast_ref::<NetxError>() {
        match netx {
            NetxError::Io(inner) => return Some(inner),
            NetxError::Other(inner) => return Some(&**inner),
            NetxError::Failure(wrapper) => return Some(&**wrapper),
            _ => {}
        }
    }
    if let Some(io_err) = err.downcast_ref::<io::Error>() {
        if let Some(inner) = io_err.get_ref() {
            return Some(inner);
        }
    }
    err.source()
}

fn classify_io(err: &io::Error) -> Option<Failure> {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => Some(Failure::ConnectionRefused),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
            Some(Failure::ConnectionReset)
        }
        io::ErrorKind::UnexpectedEof => Some(Failure::EofError),
        io::ErrorKind::TimedOut => Some(Failure::GenericTimeoutError),
        io::ErrorKind::HostUnreachable => Some(Failure::HostUnreachable),
        io::ErrorKind::NetworkUnreachable => Some(Failure::NetworkUnreachable),
        _ => None,
    }
}

fn classify_tls(err: &rustls::Error) -> Failure {
    match err {
        rustls::Error::InvalidCertificate(cert) => classify_certificate(cert),
        _ => Failure::TlsHandshakeFailure,
    }
}

fn classify_certificate(err: &CertificateError) -> Failure {
    match err {
        CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. } => {
            Failure::SslInvalidHostname
        }
        CertificateError::UnknownIssuer => Failure::SslUnknownAuthority,
        _ => Failure::SslInvalidCertificate,
    }
}

fn classify_message(message: &str) -> Option<Failure> {
    // a canonical string classifies to itself
    let parsed = Failure::from(message);
    if parsed.is_recognized() || message.starts_with(FAILURE_UNKNOWN_PREFIX) {
        return Some(parsed);
    }
    let lower = message.to_ascii_lowercase();
    if NXDOMAIN_MESSAGES.iter().any(|m| lower.contains(m)) {
        return Some(Failure::DnsNxdomainError);
    }
    if lower.contains("connection closed before message completed") {
        return Some(Failure::EofError);
    }
    if lower.contains("connection refused") {
        return Some(Failure::ConnectionRefused);
    }
    if lower.contains("connection reset") {
        return Some(Failure::ConnectionReset);
    }
    if lower.contains("timed out") || lower.contains("deadline has elapsed") {
        return Some(Failure::GenericTimeoutError);
    }
    None
}
