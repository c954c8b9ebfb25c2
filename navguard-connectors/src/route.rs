//! Async Route Service Bridge
//!
//! ## Overview
//!
//! Route recalculation is the one genuinely asynchronous collaborator of
//! the decision loop: a fleet server or companion computer may take
//! seconds to answer, and the loop must keep judging epochs meanwhile.
//! [`TokioRoutePlanner`] adapts any [`AsyncRouteService`] to the core's
//! poll-based [`RoutePlanner`] contract:
//!
//! - `request` spawns the service call on a runtime handle wrapped in a
//!   deadline, then returns immediately; the outcome is sent through a
//!   `tokio::sync::oneshot` channel.
//! - `poll` does a non-blocking `try_recv` once per epoch. A deadline
//!   overrun delivers [`RouteError::Timeout`]; a dropped sender (service
//!   task died or runtime shut down) delivers
//!   [`RouteError::Unavailable`].
//!
//! The latest request wins: re-entry or an explicit retry replaces the
//! pending receiver, and a completion is delivered at most once, exactly
//! the discipline the core's synchronous planners follow.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use navguard_core::fallback::TrustedFix;
use navguard_core::route::{FallbackRoute, RouteError, RoutePlanner, RouteRequest};

use crate::ConnectorError;

/// Asynchronous route recalculation service
///
/// Implementations plan from the pre-anomaly fix without consulting
/// current GNSS output.
#[async_trait]
pub trait AsyncRouteService: Send + Sync + 'static {
    /// Computes a fallback route from the trusted fix
    async fn recalculate(&self, fix: TrustedFix) -> Result<FallbackRoute, RouteError>;
}

/// Traffic counters for one planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteStats {
    /// Requests handed to the service
    pub requested: u32,
    /// Routes delivered
    pub completed: u32,
    /// Service-reported failures (including a vanished service)
    pub failed: u32,
    /// Requests that overran the deadline
    pub timed_out: u32,
}

/// [`RoutePlanner`] backed by an async service on a tokio runtime
pub struct TokioRoutePlanner<Svc> {
    service: Arc<Svc>,
    runtime: Handle,
    deadline: Duration,
    pending: Option<oneshot::Receiver<Result<FallbackRoute, RouteError>>>,
    stats: RouteStats,
}

impl<Svc: AsyncRouteService> TokioRoutePlanner<Svc> {
    /// Creates a planner spawning onto `runtime` with the given deadline
    pub fn new(service: Arc<Svc>, runtime: Handle, deadline: Duration) -> Self {
        Self {
            service,
            runtime,
            deadline,
            pending: None,
            stats: RouteStats::default(),
        }
    }

    /// Creates a planner on the ambient runtime
    ///
    /// Fails with [`ConnectorError::Runtime`] when called outside a
    /// tokio runtime context.
    pub fn from_current(service: Arc<Svc>, deadline: Duration) -> Result<Self, ConnectorError> {
        let runtime = Handle::try_current().map_err(|e| ConnectorError::Runtime(e.to_string()))?;
        Ok(Self::new(service, runtime, deadline))
    }

    /// Counters snapshot
    pub fn stats(&self) -> RouteStats {
        self.stats
    }

    /// True while a request is in flight
    pub fn in_flight(&self) -> bool {
        self.pending.is_some()
    }
}

impl<Svc: AsyncRouteService> RoutePlanner for TokioRoutePlanner<Svc> {
    fn request(&mut self, request: RouteRequest) {
        let (tx, rx) = oneshot::channel();
        let service = Arc::clone(&self.service);
        let deadline = self.deadline;

        self.runtime.spawn(async move {
            let outcome = match tokio::time::timeout(deadline, service.recalculate(request.fix)).await
            {
                Ok(result) => result,
                Err(_) => Err(RouteError::Timeout),
            };
            // A replaced request drops the receiver; nothing to do then
            let _ = tx.send(outcome);
        });

        // Latest request wins, matching the synchronous planners
        self.pending = Some(rx);
        self.stats.requested += 1;
        log::debug!(
            "route recalculation requested from fix at {}",
            request.fix.timestamp
        );
    }

    fn poll(&mut self) -> Option<Result<FallbackRoute, RouteError>> {
        let rx = self.pending.as_mut()?;
        match rx.try_recv() {
            Ok(outcome) => {
                self.pending = None;
                match &outcome {
                    Ok(route) => {
                        self.stats.completed += 1;
                        log::info!("fallback route ready: {} waypoints", route.waypoints.len());
                    }
                    Err(RouteError::Timeout) => {
                        self.stats.timed_out += 1;
                        log::warn!("route recalculation timed out");
                    }
                    Err(error) => {
                        self.stats.failed += 1;
                        log::warn!("route recalculation failed: {error}");
                    }
                }
                Some(outcome)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.pending = None;
                self.stats.failed += 1;
                log::warn!("route service vanished mid-request");
                Some(Err(RouteError::Unavailable))
            }
        }
    }
}
