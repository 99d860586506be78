//! Per-operation context: deadline, cancellation and measurement state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{NetxError, Operation, Result};
use crate::measurement::MeasurementRoot;

/// Context passed explicitly to every network operation.
///
/// Cloning is cheap. Children derived with the `with_*` builders share the
/// cancellation token of their parent.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: CancellationToken,
    root: Option<Arc<MeasurementRoot>>,
    dial_id: Option<u64>,
}

impl Context {
    /// A context with no deadline, no measurement root and a fresh token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the context by a timeout from now. An earlier deadline wins.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Bound the context by an absolute deadline. An earlier deadline wins.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        self
    }

    /// Use the given cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Attach the measurement root that receives events
    #[must_use]
    pub fn with_measurement_root(mut self, root: Arc<MeasurementRoot>) -> Self {
        self.root = Some(root);
        self
    }

    /// Record the dial id of the attempt in progress
    #[must_use]
    pub fn with_dial_id(mut self, dial_id: u64) -> Self {
        self.dial_id = Some(dial_id);
        self
    }

    /// Deadline, if any
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancellation token
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Measurement root, if the run is being recorded
    #[must_use]
    pub fn measurement_root(&self) -> Option<&Arc<MeasurementRoot>> {
        self.root.as_ref()
    }

    /// Dial id of the attempt in progress
    #[must_use]
    pub const fn dial_id(&self) -> Option<u64> {
        self.dial_id
    }

    /// True once the token has been cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run a future under this context.
    ///
    /// Cancellation yields `interrupted` and deadline expiry yields
    /// `generic_timeout_error`. In both cases the future is dropped before
    /// returning, which closes any socket it owned.
    pub async fn run<T, F>(&self, operation: Operation, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(NetxError::interrupted(operation));
        }
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(NetxError::interrupted(operation)),
            () = deadline => Err(NetxError::timeout(operation)),
            result = fut => result,
        }
    }
}
