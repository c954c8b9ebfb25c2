//! Route Recalculation Boundary
//!
//! ## Overview
//!
//! When the machine enters `SafeFallback` it needs somewhere to go that
//! does not depend on the now-untrusted GNSS fix. The pipeline hands the
//! snapshot [`TrustedFix`] to a [`RoutePlanner`] exactly once per entry;
//! re-invocation happens only on an explicit external retry request.
//!
//! The trait is deliberately non-blocking and poll-based: `request`
//! records the work, `poll` is called once per epoch from the decision
//! loop and returns a completion at most once per request. An
//! asynchronous bridge (task spawn, timeout, one-shot delivery) lives in
//! the connectors crate; the core stays runtime-free.
//!
//! Two planners ship here: [`NullPlanner`] for configurations where an
//! outer system owns routing, and [`HoldingPlanner`], which derives a
//! loiter pattern around the trusted fix so the platform has a safe
//! default even with no route service attached.

use heapless::Vec;
use thiserror_no_std::Error;

use crate::constants::{LOITER_RADIUS_M, MAX_ROUTE_WAYPOINTS, METERS_PER_DEG_LAT};
use crate::fallback::TrustedFix;
use crate::observation::Position;
use crate::time::Timestamp;

/// One route recalculation request
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RouteRequest {
    /// The pre-anomaly fix to plan from
    pub fix: TrustedFix,
    /// Epoch the request was issued
    pub requested_at: Timestamp,
}

/// A navigation path computed without trusting current GNSS
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FallbackRoute {
    /// Waypoints in flying order
    pub waypoints: Vec<Position, MAX_ROUTE_WAYPOINTS>,
    /// When the route was computed
    pub computed_at: Timestamp,
}

/// Route recalculation failures
///
/// Surfaced as telemetry only; the state machine stays in `SafeFallback`
/// whether or not a route arrives.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum RouteError {
    /// The provider did not answer within its deadline
    #[error("route recalculation timed out")]
    Timeout,
    /// The provider is not reachable or has shut down
    #[error("route provider unavailable")]
    Unavailable,
    /// The provider refused the request
    #[error("route request rejected: {0}")]
    Rejected(&'static str),
}

#[cfg(feature = "defmt")]
impl defmt::Format for RouteError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Timeout => defmt::write!(fmt, "route timeout"),
            Self::Unavailable => defmt::write!(fmt, "route unavailable"),
            Self::Rejected(reason) => defmt::write!(fmt, "route rejected: {}", reason),
        }
    }
}

/// Core-side seam to the route recalculation provider
pub trait RoutePlanner {
    /// Records a recalculation request; must not block
    fn request(&mut self, request: RouteRequest);

    /// Delivers a pending completion, at most once per request
    fn poll(&mut self) -> Option<Result<FallbackRoute, RouteError>>;
}

/// Planner for configurations where an outer system owns routing
///
/// Accepts requests and never completes them.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPlanner;

impl RoutePlanner for NullPlanner {
    fn request(&mut self, _request: RouteRequest) {}

    fn poll(&mut self) -> Option<Result<FallbackRoute, RouteError>> {
        None
    }
}

/// Synchronous planner deriving a loiter pattern around the trusted fix
///
/// Places [`MAX_ROUTE_WAYPOINTS`] waypoints on a circle of the configured
/// radius, starting on the fix's course so the first leg is a gentle
/// turn. Completion is delivered on the next `poll`.
#[derive(Debug, Clone)]
pub struct HoldingPlanner {
    radius_m: f64,
    pending: Option<RouteRequest>,
}

impl HoldingPlanner {
    /// Creates a planner with the given loiter radius in metres
    pub fn new(radius_m: f64) -> Self {
        Self {
            radius_m,
            pending: None,
        }
    }

    fn loiter(&self, request: &RouteRequest) -> FallbackRoute {
        let center = request.fix.position;
        let count = MAX_ROUTE_WAYPOINTS;
        let lat_scale = self.radius_m / METERS_PER_DEG_LAT;
        let lon_scale =
            self.radius_m / (METERS_PER_DEG_LAT * libm::cos(center.lat_deg.to_radians()));

        let mut waypoints = Vec::new();
        for index in 0..count {
            let angle = (request.fix.course_deg as f64
                + index as f64 * 360.0 / count as f64)
                .to_radians();
            let waypoint = Position::new(
                center.lat_deg + lat_scale * libm::cos(angle),
                center.lon_deg + lon_scale * libm::sin(angle),
                center.alt_m,
            );
            let _ = waypoints.push(waypoint);
        }

        FallbackRoute {
            waypoints,
            computed_at: request.requested_at,
        }
    }
}

impl Default for HoldingPlanner {
    fn default() -> Self {
        Self::new(LOITER_RADIUS_M)
    }
}

impl RoutePlanner for HoldingPlanner {
    fn request(&mut self, request: RouteRequest) {
        // Latest request wins; one completion per request
        self.pending = Some(request);
    }

    fn poll(&mut self) -> Option<Result<FallbackRoute, RouteError>> {
        let request = self.pending.take()?;
        Some(Ok(self.loiter(&request)))
    }
}
