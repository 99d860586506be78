//! Per-run event log and correlation identifiers.
//!
//! A [`MeasurementRoot`] is created once per measurement run and travels in
//! the [`Context`](crate::Context). Resolve, dial and handshake ids are
//! issued with an atomic increment and every low-level operation appends events to the
//! run's [`Handler`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::failure::Failure;

/// Kind of a recorded event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A name resolution is about to start
    ResolveStart,
    /// A name resolution completed, successfully or not
    ResolveDone,
    /// A dial attempt is about to start
    DialStart,
    /// A dial attempt completed, successfully or not
    Connect,
    /// A TLS handshake is about to start
    TlsHandshakeStart,
    /// A TLS handshake completed, successfully or not
    TlsHandshakeDone,
}

impl EventKind {
    /// True for the kinds that close an operation
    #[must_use]
    pub const fn is_completion(self) -> bool {
        matches!(
            self,
            Self::ResolveDone | Self::Connect | Self::TlsHandshakeDone
        )
    }
}

/// An immutable record of one low-level network event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// What happened
    pub kind: EventKind,
    /// Resolve, dial or handshake id, depending on the kind
    pub correlation_id: u64,
    /// Network the operation used (`tcp`, ...), empty for resolutions
    pub network: String,
    /// Address the operation targeted, the hostname for resolutions
    pub address: String,
    /// Addresses returned by a successful resolution
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<IpAddr>,
    /// Failure, absent on success and on start events
    pub failure: Option<Failure>,
    /// Time since the beginning of the run
    #[serde(with = "duration_secs")]
    pub t: Duration,
    /// Duration of the operation itself, completion events only
    #[serde(default, with = "duration_secs_opt")]
    pub duration: Option<Duration>,
    /// ALPN protocol negotiated by a successful handshake
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negotiated_protocol: Option<String>,
}

/// Receives the events of a run
pub trait Handler: Send + Sync {
    /// Called once per event, in emission order
    fn on_event(&self, event: Event);
}

/// Handler that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHandler;

impl Handler for NullHandler {
    fn on_event(&self, _event: Event) {}
}

/// Handler that keeps every event in an append-only log.
#[derive(Debug, Default)]
pub struct SavingHandler {
    events: Mutex<Vec<Event>>,
}

impl SavingHandler {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the log, returning the events in emission order
    pub fn read(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Handler for SavingHandler {
    fn on_event(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// State shared by every operation of one measurement run
pub struct MeasurementRoot {
    beginning: Instant,
    started_at: DateTime<Utc>,
    handler: Arc<dyn Handler>,
    next_resolve_id: AtomicU64,
    next_dial_id: AtomicU64,
    next_handshake_id: AtomicU64,
}

impl fmt::Debug for MeasurementRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeasurementRoot")
            .field("started_at", &self.started_at)
            .field("next_resolve_id", &self.next_resolve_id)
            .field("next_dial_id", &self.next_dial_id)
            .field("next_handshake_id", &self.next_handshake_id)
            .finish_non_exhaustive()
    }
}

impl MeasurementRoot {
    /// Start a run now, delivering events to the given handler
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            beginning: Instant::now(),
            started_at: Utc::now(),
            handler,
            next_resolve_id: AtomicU64::new(0),
            next_dial_id: AtomicU64::new(0),
            next_handshake_id: AtomicU64::new(0),
        }
    }

    /// Wall clock time at which the run started
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time elapsed since the beginning of the run
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.beginning.elapsed()
    }

    /// Allocate a fresh resolve id. Ids start at 1.
    pub fn next_resolve_id(&self) -> u64 {
        self.next_resolve_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Allocate a fresh dial id. Ids start at 1.
    pub fn next_dial_id(&self) -> u64 {
        self.next_dial_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Allocate a fresh handshake id. Ids start at 1.
    pub fn next_handshake_id(&self) -> u64 {
        self.next_handshake_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Deliver an event to the run's handler
    pub fn emit(&self, event: Event) {
        self.handler.on_event(event);
    }

    /// Build and deliver a start event
    pub fn emit_start(&self, kind: EventKind, correlation_id: u64, network: &str, address: &str) {
        self.emit(Event {
            kind,
            correlation_id,
            network: network.to_string(),
            address: address.to_string(),
            addresses: Vec::new(),
            failure: None,
            t: self.elapsed(),
            duration: None,
            negotiated_protocol: None,
        });
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

mod duration_secs_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(d)?
            .map(Duration::try_from_secs_f64)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}
