//! The Per-Epoch Decision Loop
//!
//! ## Overview
//!
//! [`SpoofingPipeline`] owns one of everything: extractor, both
//! detectors, fusion engine, state machine, route planner, telemetry
//! sink. Each accepted observation runs end-to-end through
//!
//! ```text
//! validate → poll route → extract → detect ×2 → fuse → advance state
//! ```
//!
//! before the next observation is accepted. The loop is single-threaded
//! and synchronous by design; the only asynchronous collaborator is the
//! route planner, which is handed a request on `SafeFallback` entry and
//! polled (never awaited) once per epoch afterwards.
//!
//! ## Determinism
//!
//! Nothing in the decision path reads a clock or a random source; state
//! advances purely on observation content and timestamps. [`reset`]
//! restores the just-constructed state, so replaying a recorded sequence
//! reproduces the exact same state trajectory — the property the
//! forensic tooling relies on.
//!
//! ## Telemetry Ordering
//!
//! Per epoch, events leave the sink in a fixed order: any route
//! completion or failure observed this epoch, then `Epoch`, then one
//! `Degraded` per detector that could not judge, then `Alert` when the
//! fused alert is flagged, then `Transition` when an edge was taken.
//! Rejected observations emit a single `Rejected` event and nothing
//! else.
//!
//! [`reset`]: SpoofingPipeline::reset

use crate::config::{ConfigError, DetectionConfig};
use crate::detectors::{Detector, KinematicDetector, SnrDetector};
use crate::errors::{PipelineError, PipelineResult, RejectReason};
use crate::fallback::{FallbackMachine, FallbackState, RecoverySignal, Transition, TrustedFix};
use crate::features::FeatureExtractor;
use crate::fusion::{FusionEngine, SpoofingAlert};
use crate::observation::Observation;
use crate::route::{NullPlanner, RoutePlanner, RouteRequest};
use crate::telemetry::{NullSink, TelemetryEvent, TelemetrySink};
use crate::time::Timestamp;

/// Outcome of processing one accepted epoch
#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    /// Epoch timestamp
    pub timestamp: Timestamp,
    /// State after this epoch
    pub state: FallbackState,
    /// The fused alert this epoch produced
    pub alert: SpoofingAlert,
    /// State-machine edge taken this epoch, if any
    pub transition: Option<Transition>,
    /// Whether GNSS output may drive navigation decisions
    pub gnss_trusted: bool,
}

/// Counters accumulated over the pipeline's life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PipelineStats {
    /// Observations accepted and processed
    pub epochs: u32,
    /// Observations rejected at the ingestion boundary
    pub rejected: u32,
    /// Epochs whose fused alert was flagged
    pub alerts: u32,
    /// State-machine edges taken
    pub transitions: u32,
    /// Route recalculation requests issued (including retries)
    pub route_requests: u32,
}

/// The detection-and-fallback decision pipeline
///
/// `W` is the SNR sliding-window length in epochs; `P` and `S` are the
/// two external seams, both static-dispatched so the loop stays
/// allocation-free. Construct through [`SpoofingPipeline::builder`].
pub struct SpoofingPipeline<const W: usize, P: RoutePlanner = NullPlanner, S: TelemetrySink = NullSink>
{
    extractor: FeatureExtractor,
    snr: SnrDetector<W>,
    kinematic: KinematicDetector,
    fusion: FusionEngine,
    machine: FallbackMachine,
    planner: P,
    sink: S,
    previous: Option<Observation>,
    /// Fix handed to the planner on the current `SafeFallback` entry;
    /// kept so an external retry re-sends the same snapshot
    route_snapshot: Option<TrustedFix>,
    stats: PipelineStats,
}

impl<const W: usize> SpoofingPipeline<W, NullPlanner, NullSink> {
    /// Starts building a pipeline around the given configuration
    pub fn builder(config: DetectionConfig) -> PipelineBuilder<W, NullPlanner, NullSink> {
        PipelineBuilder {
            config,
            planner: NullPlanner,
            sink: NullSink,
        }
    }
}

impl<const W: usize, P: RoutePlanner, S: TelemetrySink> SpoofingPipeline<W, P, S> {
    /// Current fallback state
    pub fn state(&self) -> FallbackState {
        self.machine.state()
    }

    /// Last fix recorded while GNSS was clean and trusted
    pub fn last_trusted(&self) -> Option<TrustedFix> {
        self.machine.last_trusted()
    }

    /// Counters snapshot
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Runs one observation through the full decision loop
    ///
    /// Rejections (`InvalidObservation`) skip the epoch entirely: no
    /// window push, no persistence change, no fix update. Every other
    /// shortfall degrades inside the detectors and still yields an
    /// [`EpochReport`].
    pub fn process(&mut self, observation: Observation) -> PipelineResult<EpochReport> {
        let timestamp = observation.timestamp;

        if let Some(prev) = &self.previous {
            if timestamp <= prev.timestamp {
                return Err(self.reject(timestamp, RejectReason::NonMonotonicTimestamp));
            }
        }
        if let Err(reason) = observation.validate() {
            return Err(self.reject(timestamp, reason));
        }

        // Route completion from a previous entry surfaces before the
        // epoch's own events; a failure never touches the state machine
        match self.planner.poll() {
            Some(Ok(route)) => {
                self.sink.record(&TelemetryEvent::RouteReady {
                    timestamp,
                    waypoints: route.waypoints.len() as u8,
                });
                #[cfg(feature = "log")]
                log::info!("fallback route ready: {} waypoints", route.waypoints.len());
            }
            Some(Err(error)) => {
                self.sink.record(&TelemetryEvent::ProviderFailure {
                    timestamp,
                    reason: route_failure_reason(&error),
                });
                #[cfg(feature = "log")]
                log::warn!("route recalculation failed: {error}");
            }
            None => {}
        }

        let record = self.extractor.extract(&observation, self.previous.as_ref())?;
        let verdicts = [self.snr.assess(&record), self.kinematic.assess(&record)];
        let alert = self.fusion.fuse(timestamp, &verdicts);

        let fix_candidate = TrustedFix {
            position: observation.position,
            course_deg: observation.velocity.course_deg,
            timestamp,
        };
        let transition = self.machine.advance(&alert, fix_candidate);

        if let Some(transition) = transition {
            if transition.to == FallbackState::SafeFallback {
                // The snapshot predates the anomaly; a machine that
                // never saw a clean Normal epoch falls back to the
                // current fix, which is still the best seed available
                let fix = self.machine.last_trusted().unwrap_or(fix_candidate);
                self.route_snapshot = Some(fix);
                self.planner.request(RouteRequest {
                    fix,
                    requested_at: timestamp,
                });
                self.stats.route_requests += 1;
            }
        }

        let state = self.machine.state();
        let gnss_trusted = state != FallbackState::SafeFallback;

        self.sink.record(&TelemetryEvent::Epoch {
            timestamp,
            state,
            trusted: gnss_trusted,
        });
        for verdict in verdicts.iter().filter(|v| v.is_degraded()) {
            self.sink.record(&TelemetryEvent::Degraded {
                timestamp,
                detector: verdict.detector,
                reason: verdict.reason,
            });
        }
        if alert.flagged {
            self.stats.alerts += 1;
            self.sink.record(&TelemetryEvent::Alert(alert.clone()));
            #[cfg(feature = "log")]
            if alert.actionable {
                log::warn!(
                    "actionable spoofing alert at {timestamp}: confidence {:.2}, {} consecutive",
                    alert.confidence.as_float(),
                    alert.consecutive_flagged
                );
            } else {
                log::debug!(
                    "spoofing alert at {timestamp}: confidence {:.2}",
                    alert.confidence.as_float()
                );
            }
        }
        if let Some(transition) = transition {
            self.stats.transitions += 1;
            self.sink.record(&TelemetryEvent::Transition(transition));
            #[cfg(feature = "log")]
            log::warn!(
                "state {} -> {} ({})",
                transition.from.as_str(),
                transition.to.as_str(),
                transition.cause.as_str()
            );
        }

        self.stats.epochs += 1;
        self.previous = Some(observation);

        Ok(EpochReport {
            timestamp,
            state,
            alert,
            transition,
            gnss_trusted,
        })
    }

    /// Re-issues the route request with the unchanged snapshot
    ///
    /// The external retry path of the provider contract. Meaningful only
    /// in `SafeFallback`; returns whether a request was sent.
    pub fn retry_route(&mut self) -> bool {
        if self.machine.state() != FallbackState::SafeFallback {
            return false;
        }
        let Some(fix) = self.route_snapshot else {
            return false;
        };
        self.planner.request(RouteRequest {
            fix,
            requested_at: fix.timestamp,
        });
        self.stats.route_requests += 1;
        true
    }

    /// Applies an out-of-band recovery signal
    ///
    /// The only path out of `SafeFallback`; forwarded to the state
    /// machine and mirrored onto the telemetry stream. `now` stamps the
    /// transition since no observation drives it.
    pub fn recover(&mut self, signal: RecoverySignal, now: Timestamp) -> Option<Transition> {
        let transition = self.machine.recover(signal, now)?;
        self.route_snapshot = None;
        self.stats.transitions += 1;
        self.sink.record(&TelemetryEvent::Transition(transition));
        #[cfg(feature = "log")]
        log::info!("external recovery accepted at {now}");
        Some(transition)
    }

    /// Restores the just-constructed state for a deterministic replay
    ///
    /// Counters are zeroed along with detector, fusion, and machine
    /// state; the planner and sink are external and keep theirs.
    pub fn reset(&mut self) {
        self.snr.reset();
        self.kinematic.reset();
        self.fusion.reset();
        self.machine.reset();
        self.previous = None;
        self.route_snapshot = None;
        self.stats = PipelineStats::default();
    }

    /// Graceful shutdown: discards the partial window, returns counters
    ///
    /// `process` is atomic per epoch, so there is never a half-judged
    /// epoch to flush; the window contents are simply dropped without a
    /// final evaluation.
    pub fn shutdown(self) -> PipelineStats {
        self.stats
    }

    fn reject(&mut self, timestamp: Timestamp, reason: RejectReason) -> PipelineError {
        self.stats.rejected += 1;
        self.sink.record(&TelemetryEvent::Rejected { timestamp, reason });
        #[cfg(feature = "log")]
        log::debug!("observation at {timestamp} rejected: {}", reason.as_str());
        PipelineError::InvalidObservation { reason }
    }
}

/// Stable short label for a route failure, for telemetry payloads
fn route_failure_reason(error: &crate::route::RouteError) -> &'static str {
    use crate::route::RouteError;
    match *error {
        RouteError::Timeout => "timeout",
        RouteError::Unavailable => "unavailable",
        RouteError::Rejected(reason) => reason,
    }
}

/// Staged construction of a [`SpoofingPipeline`]
///
/// ```rust
/// use navguard_core::config::DetectionConfig;
/// use navguard_core::pipeline::SpoofingPipeline;
/// use navguard_core::route::HoldingPlanner;
///
/// let pipeline: navguard_core::pipeline::SpoofingPipeline<8, _, _> =
///     SpoofingPipeline::builder(DetectionConfig::multirotor())
///         .planner(HoldingPlanner::default())
///         .build()
///         .unwrap();
/// # let _ = pipeline;
/// ```
pub struct PipelineBuilder<const W: usize, P: RoutePlanner, S: TelemetrySink> {
    config: DetectionConfig,
    planner: P,
    sink: S,
}

impl<const W: usize, P: RoutePlanner, S: TelemetrySink> PipelineBuilder<W, P, S> {
    /// Sets the route recalculation planner
    pub fn planner<P2: RoutePlanner>(self, planner: P2) -> PipelineBuilder<W, P2, S> {
        PipelineBuilder {
            config: self.config,
            planner,
            sink: self.sink,
        }
    }

    /// Sets the telemetry sink
    pub fn sink<S2: TelemetrySink>(self, sink: S2) -> PipelineBuilder<W, P, S2> {
        PipelineBuilder {
            config: self.config,
            planner: self.planner,
            sink,
        }
    }

    /// Validates the configuration and assembles the pipeline
    pub fn build(self) -> Result<SpoofingPipeline<W, P, S>, ConfigError> {
        self.config.validate()?;
        if W < self.config.snr.sustain_epochs as usize {
            return Err(ConfigError("window length must cover the sustain run"));
        }
        Ok(SpoofingPipeline {
            extractor: FeatureExtractor::new(&self.config),
            snr: SnrDetector::new(self.config.snr),
            kinematic: KinematicDetector::new(self.config.kinematic),
            fusion: FusionEngine::new(self.config.fusion),
            machine: FallbackMachine::new(&self.config),
            planner: self.planner,
            sink: self.sink,
            previous: None,
            route_snapshot: None,
            stats: PipelineStats::default(),
        })
    }
}
