//! Reduction of several attempt failures to the most informative one.

use crate::error::NetxError;

/// Pick the error that best represents a set of failed attempts.
///
/// The first classified error whose failure is part of the taxonomy wins,
/// in attempt order. When there is none, the first error is returned.
/// An empty input yields `None`.
pub fn reduce_errors(errors: Vec<NetxError>) -> Option<NetxError> {
    let position = errors
        .iter()
        .position(|err| err.classified().is_some_and(|f| f.is_recognized()))
        .unwrap_or(0);
    errors.into_iter().nth(position)
}
