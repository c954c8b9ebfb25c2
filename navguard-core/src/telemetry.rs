//! Telemetry/Map Sink Boundary
//!
//! ## Overview
//!
//! Everything the pipeline wants the outside world to see — epoch
//! summaries, alerts, transitions, rejects, degradations, route
//! completions — leaves through a [`TelemetrySink`]. Delivery is
//! best-effort by construction:
//!
//! - `record` is infallible, so a slow or broken sink cannot inject an
//!   error path into the decision loop;
//! - implementations must not block; buffering sinks drop instead of
//!   waiting (see [`TelemetryQueue`](crate::queue::TelemetryQueue));
//! - events describe decisions already taken — nothing downstream of the
//!   sink can alter an outcome.
//!
//! Ordering within one epoch is fixed by the pipeline: `Epoch` first,
//! then any `Degraded`, then `Alert` when flagged, then `Transition`.

use crate::detectors::{DetectorId, VerdictReason};
use crate::errors::RejectReason;
use crate::fallback::{FallbackState, Transition};
use crate::fusion::SpoofingAlert;
use crate::time::Timestamp;

/// One pipeline event for display, mapping, or forensics
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TelemetryEvent {
    /// Per-epoch summary, emitted for every accepted epoch
    Epoch {
        /// Epoch timestamp
        timestamp: Timestamp,
        /// State after this epoch
        state: FallbackState,
        /// Whether GNSS output is currently trusted for navigation
        trusted: bool,
    },
    /// Fused alert for a flagged epoch
    Alert(SpoofingAlert),
    /// A state-machine edge was taken
    Transition(Transition),
    /// An observation was rejected at ingestion
    Rejected {
        /// Timestamp carried by the rejected observation
        timestamp: Timestamp,
        /// Why it was rejected
        reason: RejectReason,
    },
    /// A detector lacked the data to judge an epoch
    Degraded {
        /// Epoch timestamp
        timestamp: Timestamp,
        /// Which detector degraded
        detector: DetectorId,
        /// `InsufficientData`, `Stabilizing`, or `StaleHistory`
        reason: VerdictReason,
    },
    /// Route recalculation completed
    RouteReady {
        /// Epoch the completion was observed
        timestamp: Timestamp,
        /// Waypoints in the computed route
        waypoints: u8,
    },
    /// Route recalculation failed; the state machine is unaffected
    ProviderFailure {
        /// Epoch the failure was observed
        timestamp: Timestamp,
        /// Provider-supplied description
        reason: &'static str,
    },
}

impl TelemetryEvent {
    /// Stable event-kind label for logs and serialized output
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Epoch { .. } => "epoch",
            Self::Alert(_) => "alert",
            Self::Transition(_) => "transition",
            Self::Rejected { .. } => "rejected",
            Self::Degraded { .. } => "degraded",
            Self::RouteReady { .. } => "route_ready",
            Self::ProviderFailure { .. } => "provider_failure",
        }
    }

    /// Timestamp the event refers to
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Self::Epoch { timestamp, .. }
            | Self::Rejected { timestamp, .. }
            | Self::Degraded { timestamp, .. }
            | Self::RouteReady { timestamp, .. }
            | Self::ProviderFailure { timestamp, .. } => *timestamp,
            Self::Alert(alert) => alert.timestamp,
            Self::Transition(transition) => transition.at,
        }
    }
}

/// Where pipeline events go
///
/// `record` must return promptly and must not fail; delivery guarantees
/// end at this call.
pub trait TelemetrySink {
    /// Consumes one event
    fn record(&mut self, event: &TelemetryEvent);
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn record(&mut self, _event: &TelemetryEvent) {}
}
