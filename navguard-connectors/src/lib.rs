//! Host-Side Adapters for the NavGuard Decision Pipeline
//!
//! ## Overview
//!
//! The core crate is `no_std`-capable and runtime-free: its two external
//! seams are the synchronous, poll-based [`RoutePlanner`] and the
//! infallible [`TelemetrySink`]. This crate supplies the host-side
//! implementations of both seams:
//!
//! - [`route`] — bridges an async route recalculation service (fleet
//!   server, companion computer, ground station) into the core's
//!   poll-based planner contract. The decision loop never awaits: the
//!   service call is spawned on a tokio runtime handle with a deadline,
//!   and its outcome travels back over a one-shot channel the loop polls
//!   once per epoch.
//! - [`forensic`] — telemetry sinks for after-the-fact analysis. The
//!   JSONL sink writes one serialized event per line so a spoofing
//!   incident can be replayed exactly, including everything GNSS
//!   reported while untrusted; the log sink forwards events to the
//!   `log` facade by severity for live operation.
//!
//! ## Failure Philosophy
//!
//! Adapters inherit the core's contracts: a sink must never fail into
//! the decision loop (write errors are counted, not raised), and a
//! route provider failure is telemetry, never a state change. Timeouts
//! map to [`RouteError::Timeout`], a vanished service to
//! [`RouteError::Unavailable`].
//!
//! [`RoutePlanner`]: navguard_core::route::RoutePlanner
//! [`TelemetrySink`]: navguard_core::telemetry::TelemetrySink
//! [`RouteError::Timeout`]: navguard_core::route::RouteError
//! [`RouteError::Unavailable`]: navguard_core::route::RouteError

pub mod forensic;
pub mod route;

pub use forensic::{JsonlSink, LogSink};
pub use route::{AsyncRouteService, RouteStats, TokioRoutePlanner};

use thiserror::Error;

/// Adapter-level failures
///
/// Route-service failures surface through the core's `RouteError`; this
/// type covers the adapters' own plumbing: the JSONL sink's write and
/// flush path ([`Io`](ConnectorError::Io) /
/// [`Serialization`](ConnectorError::Serialization)) and runtime
/// discovery for the tokio planner
/// ([`Runtime`](ConnectorError::Runtime)).
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("runtime unavailable: {0}")]
    Runtime(String),
}
