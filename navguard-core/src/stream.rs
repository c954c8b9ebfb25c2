//! Observation Ingestion
//!
//! ## Overview
//!
//! The pipeline consumes observations through a poll-based,
//! non-blocking trait in the `nb` style: `poll_next` either yields an
//! observation, signals `WouldBlock` when none is ready yet, or fails
//! with a terminal [`StreamError`]. The decision loop never parks on
//! I/O; on embedded targets the same trait sits directly over a UART
//! parser, on hosts over a replay file or socket adapter.
//!
//! Producers own ordering and unit normalization (degrees, dB-Hz,
//! metres); the pipeline enforces rejection semantics on what arrives.
//! [`MemoryStream`] replays a recorded slice for tests and determinism
//! checks.

use thiserror_no_std::Error;

use crate::observation::Observation;

/// Terminal ingestion failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// The source has no further observations
    #[error("end of observation stream")]
    EndOfStream,
    /// The source produced bytes that do not parse as an observation
    #[error("malformed observation: {0}")]
    Format(&'static str),
    /// The underlying transport failed
    #[error("observation transport failed")]
    Transport,
}

/// Non-blocking source of observations
pub trait ObservationStream {
    /// Polls for the next observation
    ///
    /// `nb::Error::WouldBlock` means try again later; `Other` carries a
    /// terminal error.
    fn poll_next(&mut self) -> nb::Result<Observation, StreamError>;

    /// Bounds on how many observations remain, when known
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, None)
    }
}

/// Replay stream over a recorded observation slice
pub struct MemoryStream<'a> {
    observations: &'a [Observation],
    position: usize,
}

impl<'a> MemoryStream<'a> {
    /// Creates a stream positioned at the start of the slice
    pub fn new(observations: &'a [Observation]) -> Self {
        Self {
            observations,
            position: 0,
        }
    }

    /// Rewinds to the start for another replay
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Observations already yielded
    pub fn position(&self) -> usize {
        self.position
    }
}

impl ObservationStream for MemoryStream<'_> {
    fn poll_next(&mut self) -> nb::Result<Observation, StreamError> {
        match self.observations.get(self.position) {
            Some(observation) => {
                self.position += 1;
                Ok(observation.clone())
            }
            None => Err(nb::Error::Other(StreamError::EndOfStream)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.observations.len() - self.position;
        (remaining, Some(remaining))
    }
}
