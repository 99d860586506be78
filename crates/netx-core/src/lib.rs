//! Core types for the netx transport stack.
//!
//! This crate holds everything the transport layers share:
//!
//! - **Failures**: the canonical taxonomy ([`Failure`]), the classifier
//!   ([`classify`]) and reduction of many failures to one ([`reduce_errors`])
//! - **Errors**: [`NetxError`] and the classified [`ErrWrapper`]
//! - **Context**: deadline, cancellation and the run's [`MeasurementRoot`]
//! - **Events**: the per-run event log and its archival form
//!
//! # Example
//!
//! ```rust
//! use netx_core::{Failure, NetxError, Operation, reduce_errors};
//!
//! let reduced = reduce_errors(vec![
//!     NetxError::other("mocked error"),
//!     NetxError::failure(Failure::ConnectionRefused, Operation::Connect),
//! ]);
//! assert_eq!(reduced.unwrap().to_string(), "connection_refused");
//! ```

pub mod archival;
mod bogon;
mod bytecounter;
mod classify;
mod context;
mod endpoint;
mod error;
mod failure;
mod logger;
mod measurement;
mod reduce;

pub use bogon::{is_bogon, is_bogon_str};
pub use bytecounter::ByteCounter;
pub use classify::classify;
pub use context::Context;
pub use endpoint::Endpoint;
pub use error::{BoxError, ErrWrapper, NetxError, Operation, Result};
pub use failure::*;
pub use logger::{Logger, SavingLogger, TracingLogger};
pub use measurement::{Event, EventKind, Handler, MeasurementRoot, NullHandler, SavingHandler};
pub use reduce::reduce_errors;
