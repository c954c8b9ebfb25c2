//! Error Types for the Detection Pipeline
//!
//! ## Design Philosophy
//!
//! NavGuard's error system follows the taxonomy of the decision loop:
//!
//! 1. **Small Size**: Each variant is kept minimal since errors are
//!    returned per epoch and may be mirrored onto the telemetry queue.
//!
//! 2. **No Heap Allocation**: All error data is inline - no String, only
//!    `&'static str` for messages. This ensures deterministic memory usage.
//!
//! 3. **Copy Semantics**: Errors implement Copy for efficient return from
//!    the hot per-epoch path.
//!
//! ## Error Categories
//!
//! ### Recoverable, handled inside the loop
//! - `InsufficientData`: too few usable satellites or a missing predecessor
//!   epoch. The affected detector degrades its verdict to confidence zero;
//!   the pipeline never aborts on it.
//!
//! ### Rejected at the ingestion boundary
//! - `InvalidObservation`: malformed or out-of-order input. The epoch is
//!   skipped, counted, and reported on the telemetry stream. Producers are
//!   responsible for ordering and unit normalization; the pipeline only
//!   enforces rejection.
//!
//! ### External collaborator failures
//! - `ProviderFailure`: route recalculation error or timeout. Surfaced as a
//!   telemetry event; never changes the fallback state, since safety must
//!   not depend on recalculation succeeding.
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use navguard_core::errors::{PipelineError, RejectReason};
//!
//! fn handle(err: PipelineError) {
//!     match err {
//!         PipelineError::InvalidObservation { reason: RejectReason::NonMonotonicTimestamp } => {
//!             // Producer replayed or reordered epochs - drop and continue
//!         }
//!         PipelineError::InvalidObservation { .. } => {
//!             // Malformed input - drop and continue
//!         }
//!         PipelineError::InsufficientData { .. } => {
//!             // Degraded constellation - detectors already reported it
//!         }
//!         PipelineError::ProviderFailure { .. } => {
//!             // Route recalculation failed - state machine stays put
//!         }
//!     }
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Why an observation was rejected at the ingestion boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RejectReason {
    /// Timestamp not strictly greater than the previous accepted epoch
    NonMonotonicTimestamp,
    /// A position, velocity, or signal field is NaN or infinite
    NonFiniteField,
    /// Observation carries no satellite records at all
    EmptyConstellation,
    /// Elevation outside [0, 90], or azimuth/course outside [0, 360)
    AngleOutOfRange,
    /// C/N0 outside the representable receiver range
    SignalOutOfRange,
}

impl RejectReason {
    /// Short stable label for logs and telemetry
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NonMonotonicTimestamp => "non-monotonic timestamp",
            Self::NonFiniteField => "non-finite field",
            Self::EmptyConstellation => "empty constellation",
            Self::AngleOutOfRange => "angle out of range",
            Self::SignalOutOfRange => "signal out of range",
        }
    }
}

/// Pipeline errors - kept small, Copy, heap-free
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum PipelineError {
    /// Too few usable satellites, or the predecessor epoch is missing
    ///
    /// Inside the decision loop this condition is expressed as a
    /// degraded zero-confidence verdict, never as an error. The error
    /// form exists for hosts that call the extraction or detection
    /// stages directly and want a hard failure instead.
    #[error("Insufficient data: need {required}, have {available}")]
    InsufficientData {
        /// Minimum usable satellites (or epochs) needed
        required: u8,
        /// Actually available
        available: u8,
    },

    /// Malformed or out-of-order observation, rejected before extraction
    #[error("Invalid observation: {reason:?}")]
    InvalidObservation {
        /// Classified rejection cause
        reason: RejectReason,
    },

    /// Route recalculation provider failed or timed out
    ///
    /// The loop surfaces provider failures as telemetry only and keeps
    /// the fallback state untouched. The error form exists for hosts
    /// that drive a planner themselves and promote route failures to
    /// hard errors.
    #[error("Route provider failure: {reason}")]
    ProviderFailure {
        /// Provider-supplied failure description
        reason: &'static str,
    },
}

impl PipelineError {
    /// True for conditions the loop absorbs without skipping the epoch
    pub const fn is_degradation(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PipelineError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::InsufficientData { required, available } =>
                defmt::write!(fmt, "Need {} satellites, have {}", required, available),
            Self::InvalidObservation { reason } =>
                defmt::write!(fmt, "Rejected: {}", reason.as_str()),
            Self::ProviderFailure { reason } =>
                defmt::write!(fmt, "Provider failure: {}", reason),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for RejectReason {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.as_str());
    }
}
