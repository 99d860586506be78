use async_trait::async_trait;
use netx_core::{Context, Event, EventKind, Result};

use super::{BoxConn, Dialer};

/// Correlates each dial attempt with a fresh dial id and records it.
///
/// Emits `dial_start` before dialing and exactly one `connect` event after,
/// both carrying the same id. The id is also stored in the context handed
/// to the inner dialer and stamped on a returned failure. Without a
/// measurement root in the context this layer does nothing.
#[derive(Debug, Clone)]
pub struct EmitterDialer<D> {
    dialer: D,
}

impl<D> EmitterDialer<D> {
    /// Record the attempts made through `dialer`
    #[must_use]
    pub const fn new(dialer: D) -> Self {
        Self { dialer }
    }
}

#[async_trait]
impl<D: Dialer> Dialer for EmitterDialer<D> {
    async fn dial(&self, ctx: &Context, network: &str, address: &str) -> Result<BoxConn> {
        let Some(root) = ctx.measurement_root() else {
            return self.dialer.dial(ctx, network, address).await;
        };
        let dial_id = root.next_dial_id();
        root.emit_start(EventKind::DialStart, dial_id, network, address);

        let started = root.elapsed();
        let child = ctx.clone().with_dial_id(dial_id);
        let result = self.dialer.dial(&child, network, address).await;
        let t = root.elapsed();

        root.emit(Event {
            kind: EventKind::Connect,
            correlation_id: dial_id,
            network: network.to_string(),
            address: address.to_string(),
            addresses: Vec::new(),
            failure: result.as_ref().err().map(netx_core::NetxError::to_failure),
            t,
            duration: Some(t.saturating_sub(started)),
            negotiated_protocol: None,
        });
        result.map_err(|err| err.with_dial_id(dial_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialer::ErrorWrapperDialer;
    use crate::mocks::{EofConnDialer, EofDialer};
    use netx_core::{Failure, MeasurementRoot, SavingHandler};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn recording_context() -> (Context, Arc<SavingHandler>) {
        let saver = Arc::new(SavingHandler::new());
        let root = Arc::new(MeasurementRoot::new(saver.clone()));
        (Context::new().with_measurement_root(root), saver)
    }

    #[tokio::test]
    async fn test_success_emits_start_then_connect() {
        let (ctx, saver) = recording_context();
        let dialer = EmitterDialer::new(EofConnDialer);
        assert!(dialer.dial(&ctx, "tcp", "1.1.1.1:853").await.is_ok());

        let events = saver.read();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::DialStart);
        assert_eq!(events[1].kind, EventKind::Connect);
        assert_eq!(events[0].correlation_id, events[1].correlation_id);
        assert!(events[1].failure.is_none());
        assert!(events[1].duration.is_some());
    }

    #[tokio::test]
    async fn test_failure_carries_dial_id() {
        let (ctx, saver) = recording_context();
        let dialer = EmitterDialer::new(ErrorWrapperDialer::new(EofDialer));
        let err = dialer.dial(&ctx, "tcp", "1.1.1.1:853").await.err().unwrap();

        let events = saver.read();
        assert_eq!(events[1].failure, Some(Failure::EofError));
        assert_eq!(err.dial_id(), Some(events[1].correlation_id));
    }

    #[tokio::test]
    async fn test_no_root_is_passthrough() {
        let dialer = EmitterDialer::new(ErrorWrapperDialer::new(EofDialer));
        let err = dialer
            .dial(&Context::new(), "tcp", "1.1.1.1:853")
            .await
            .err()
            .unwrap();
        assert_eq!(err.dial_id(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_dials_keep_ids_unique_and_ordered() {
        let (ctx, saver) = recording_context();
        let dialer = Arc::new(EmitterDialer::new(ErrorWrapperDialer::new(EofDialer)));
        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let ctx = ctx.clone();
                let dialer = Arc::clone(&dialer);
                tokio::spawn(async move {
                    let _ = dialer.dial(&ctx, "tcp", "1.1.1.1:853").await;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let events = saver.read();
        assert_eq!(events.len(), 64);
        let mut started = HashSet::new();
        let mut completed = HashSet::new();
        for ev in &events {
            match ev.kind {
                EventKind::DialStart => assert!(started.insert(ev.correlation_id)),
                EventKind::Connect => {
                    assert!(started.contains(&ev.correlation_id), "connect before start");
                    assert!(completed.insert(ev.correlation_id));
                }
                _ => unreachable!(),
            }
        }
        assert_eq!(completed.len(), 32);
    }
}
