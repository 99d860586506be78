//! Serialisable archival records derived from the event log.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

use crate::endpoint::Endpoint;
use crate::error::NetxError;
use crate::measurement::{Event, EventKind, MeasurementRoot};

/// Layout of `measurement_start_time`
const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One answer of a `queries` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsAnswerEntry {
    pub answer_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
}

/// One `queries` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsQueryEntry {
    pub resolve_id: u64,
    pub answers: Vec<DnsAnswerEntry>,
    pub failure: Option<String>,
    pub hostname: String,
    pub query_type: String,
    pub t: f64,
}

/// Outcome of a TCP connect attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpConnectStatus {
    /// Set by experiment logic after comparing with a control; never set here
    #[serde(default)]
    pub blocked: Option<bool>,
    pub failure: Option<String>,
    pub success: bool,
}

/// One `tcp_connect` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcpConnectEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dial_id: Option<u64>,
    pub ip: String,
    pub port: u16,
    pub status: TcpConnectStatus,
    pub t: f64,
}

/// One `tls_handshakes` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TlsHandshakeEntry {
    pub handshake_id: u64,
    pub address: String,
    pub failure: Option<String>,
    #[serde(default)]
    pub negotiated_protocol: Option<String>,
    pub t: f64,
}

/// Render an optional error as an archival failure string
pub fn new_failure(err: Option<&NetxError>) -> Option<String> {
    err.map(|e| e.to_failure().to_string())
}

/// Render the run's wall clock start as `measurement_start_time` (UTC)
pub fn new_measurement_start_time(root: &MeasurementRoot) -> String {
    root.started_at().format(START_TIME_FORMAT).to_string()
}

/// Build the `queries` list from `resolve_done` events.
///
/// Each resolution yields an `A` and an `AAAA` entry sharing the same
/// failure, since the resolvers ask for both families at once.
pub fn new_dns_queries_list(events: &[Event]) -> Vec<DnsQueryEntry> {
    events
        .iter()
        .filter(|ev| ev.kind == EventKind::ResolveDone)
        .flat_map(|ev| {
            let failure = ev.failure.as_ref().map(ToString::to_string);
            ["A", "AAAA"].map(|query_type| DnsQueryEntry {
                resolve_id: ev.correlation_id,
                answers: ev
                    .addresses
                    .iter()
                    .filter_map(|addr| answer_for(query_type, *addr))
                    .collect(),
                failure: failure.clone(),
                hostname: ev.address.clone(),
                query_type: query_type.to_string(),
                t: ev.t.as_secs_f64(),
            })
        })
        .collect()
}

fn answer_for(query_type: &str, addr: IpAddr) -> Option<DnsAnswerEntry> {
    match (query_type, addr) {
        ("A", IpAddr::V4(v4)) => Some(DnsAnswerEntry {
            answer_type: "A".into(),
            ipv4: Some(v4.to_string()),
            ipv6: None,
        }),
        ("AAAA", IpAddr::V6(v6)) => Some(DnsAnswerEntry {
            answer_type: "AAAA".into(),
            ipv4: None,
            ipv6: Some(v6.to_string()),
        }),
        _ => None,
    }
}

/// Build the `tcp_connect` list from `connect` events.
///
/// Events whose address is not an IP literal are skipped: those come from
/// layers above name resolution and do not describe a single socket.
pub fn new_tcp_connect_list(events: &[Event]) -> Vec<TcpConnectEntry> {
    events
        .iter()
        .filter(|ev| ev.kind == EventKind::Connect)
        .filter_map(|ev| {
            let addr: SocketAddr = ev.address.parse::<Endpoint>().ok()?.socket_addr()?;
            Some(TcpConnectEntry {
                dial_id: Some(ev.correlation_id),
                ip: addr.ip().to_string(),
                port: addr.port(),
                status: TcpConnectStatus {
                    blocked: None,
                    failure: ev.failure.as_ref().map(ToString::to_string),
                    success: ev.failure.is_none(),
                },
                t: ev.t.as_secs_f64(),
            })
        })
        .collect()
}

/// Build the `tls_handshakes` list from `tls_handshake_done` events
pub fn new_tls_handshakes_list(events: &[Event]) -> Vec<TlsHandshakeEntry> {
    events
        .iter()
        .filter(|ev| ev.kind == EventKind::TlsHandshakeDone)
        .map(|ev| TlsHandshakeEntry {
            handshake_id: ev.correlation_id,
            address: ev.address.clone(),
            failure: ev.failure.as_ref().map(ToString::to_string),
            negotiated_protocol: ev.negotiated_protocol.clone(),
            t: ev.t.as_secs_f64(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Operation;
    use crate::failure::Failure;
    use chrono::Timelike;
    use std::time::Duration;

    fn event(kind: EventKind, id: u64, address: &str, failure: Option<Failure>) -> Event {
        Event {
            kind,
            correlation_id: id,
            network: "tcp".into(),
            address: address.into(),
            addresses: Vec::new(),
            failure,
            t: Duration::from_millis(250),
            duration: None,
            negotiated_protocol: None,
        }
    }

    #[test]
    fn test_tcp_connect_list() {
        let events = vec![
            event(EventKind::DialStart, 1, "1.1.1.1:853", None),
            event(EventKind::Connect, 1, "1.1.1.1:853", Some(Failure::EofError)),
            event(EventKind::DialStart, 2, "[2606:4700::1111]:853", None),
            event(EventKind::Connect, 2, "[2606:4700::1111]:853", None),
            event(EventKind::Connect, 3, "dot.dns:853", None),
        ];
        let list = new_tcp_connect_list(&events);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].ip, "1.1.1.1");
        assert_eq!(list[0].status.failure.as_deref(), Some("eof_error"));
        assert!(!list[0].status.success);
        assert_eq!(list[1].ip, "2606:4700::1111");
        assert_eq!(list[1].port, 853);
        assert!(list[1].status.success);
        assert_eq!(list[1].dial_id, Some(2));

        let json = serde_json::to_value(&list[0]).unwrap();
        assert_eq!(json["status"]["blocked"], serde_json::Value::Null);
        assert_eq!(json["t"], 0.25);
    }

    #[test]
    fn test_tls_handshakes_list() {
        let mut done = event(EventKind::TlsHandshakeDone, 1, "1.1.1.1:443", None);
        done.negotiated_protocol = Some("h2".into());
        let events = vec![
            event(EventKind::TlsHandshakeStart, 1, "1.1.1.1:443", None),
            done,
        ];
        let list = new_tls_handshakes_list(&events);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].negotiated_protocol.as_deref(), Some("h2"));
        assert!(list[0].failure.is_none());
    }

    #[test]
    fn test_dns_queries_list() {
        let mut ok = event(EventKind::ResolveDone, 1, "dns.google", None);
        ok.addresses = vec!["8.8.8.8".parse().unwrap(), "2001:4860:4860::8888".parse().unwrap()];
        let events = vec![
            event(EventKind::ResolveStart, 1, "dns.google", None),
            ok,
            event(EventKind::ResolveStart, 2, "example.com", None),
            event(EventKind::ResolveDone, 2, "example.com", Some(Failure::DnsBogonError)),
            event(EventKind::Connect, 1, "8.8.8.8:443", None),
        ];
        let list = new_dns_queries_list(&events);
        assert_eq!(list.len(), 4);

        assert_eq!(list[0].query_type, "A");
        assert_eq!(list[0].hostname, "dns.google");
        assert_eq!(list[0].answers.len(), 1);
        assert_eq!(list[0].answers[0].ipv4.as_deref(), Some("8.8.8.8"));
        assert_eq!(list[1].query_type, "AAAA");
        assert_eq!(list[1].answers[0].ipv6.as_deref(), Some("2001:4860:4860::8888"));
        assert!(list[1].failure.is_none());

        assert_eq!(list[2].resolve_id, 2);
        assert!(list[2].answers.is_empty());
        assert_eq!(list[2].failure.as_deref(), Some("dns_bogon_error"));
        assert_eq!(list[3].failure.as_deref(), Some("dns_bogon_error"));

        let json = serde_json::to_value(&list[0]).unwrap();
        assert_eq!(json["answers"][0]["answer_type"], "A");
        assert!(json["answers"][0].get("ipv6").is_none());
    }

    #[test]
    fn test_measurement_start_time() {
        let root = MeasurementRoot::new(std::sync::Arc::new(crate::NullHandler));
        let rendered = new_measurement_start_time(&root);
        assert_eq!(rendered.len(), "2024-01-01 00:00:00".len());
        let parsed = chrono::NaiveDateTime::parse_from_str(&rendered, START_TIME_FORMAT).unwrap();
        assert_eq!(parsed, root.started_at().naive_utc().with_nanosecond(0).unwrap());
    }

    #[test]
    fn test_new_failure() {
        assert_eq!(new_failure(None), None);
        let err = NetxError::failure(Failure::ConnectionRefused, Operation::Connect);
        assert_eq!(new_failure(Some(&err)).as_deref(), Some("connection_refused"));
        let raw = NetxError::other("mocked error");
        assert_eq!(
            new_failure(Some(&raw)).as_deref(),
            Some("unknown_failure: mocked error")
        );
    }
}
