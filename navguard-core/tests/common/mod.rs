//! Shared scenario generators and test doubles for the integration suites
//!
//! Observation sequences mimic a small multirotor at a 1 Hz epoch rate:
//! six GPS satellites at mixed elevations, ~4.5 m/s ground speed heading
//! east. Spoofed epochs collapse the cross-satellite C/N0 spread to the
//! single-emitter signature while keeping the trajectory plausible, so
//! only the signal statistics give the attack away.
#![allow(dead_code)]

pub mod harness;

use std::cell::RefCell;
use std::rc::Rc;

use navguard_core::config::DetectionConfig;
use navguard_core::observation::Observation;
use navguard_core::pipeline::SpoofingPipeline;
use navguard_core::route::{FallbackRoute, RouteError, RoutePlanner, RouteRequest};
use navguard_core::telemetry::{TelemetryEvent, TelemetrySink};

use harness::TestRng;

/// Epoch interval of the simulated receiver
pub const EPOCH_MS: u64 = 1_000;

/// Degrees of latitude per epoch at ~4.45 m/s ground speed
pub const LAT_STEP_DEG: f64 = 0.00004;

/// Healthy epoch: six satellites with several dB of spread
///
/// Jitter keeps the C/N0 table from being suspiciously static without
/// disturbing the healthy variance.
pub fn clean_observation(timestamp: u64, lat: f64, rng: &mut TestRng) -> Observation {
    let mut j = |base: f32| base + rng.gen_range(-0.3, 0.3);
    Observation::builder(timestamp)
        .position(lat, -122.33, 60.0)
        .velocity(4.5, 90.0)
        .satellite(2, j(44.0), 65.0, 30.0)
        .satellite(5, j(47.5), 80.0, 120.0)
        .satellite(7, j(41.0), 35.0, 200.0)
        .satellite(13, j(45.5), 55.0, 280.0)
        .satellite(19, j(39.0), 25.0, 90.0)
        .satellite(24, j(46.0), 70.0, 330.0)
        .build()
}

/// Spoofed epoch: same constellation and trajectory, collapsed spread
///
/// Every satellite lands within 0.1 dB-Hz of 45.0, the fingerprint of a
/// single emitter carrying all six signals.
pub fn collapsed_observation(timestamp: u64, lat: f64) -> Observation {
    Observation::builder(timestamp)
        .position(lat, -122.33, 60.0)
        .velocity(4.5, 90.0)
        .satellite(2, 45.0, 65.0, 30.0)
        .satellite(5, 45.1, 80.0, 120.0)
        .satellite(7, 44.9, 35.0, 200.0)
        .satellite(13, 45.0, 55.0, 280.0)
        .satellite(19, 45.1, 25.0, 90.0)
        .satellite(24, 44.9, 70.0, 330.0)
        .build()
}

/// A steady clean flight of `epochs` observations starting at `start_ts`
pub fn clean_flight(start_ts: u64, start_lat: f64, epochs: usize, rng: &mut TestRng) -> Vec<Observation> {
    (0..epochs)
        .map(|i| {
            clean_observation(
                start_ts + i as u64 * EPOCH_MS,
                start_lat + i as f64 * LAT_STEP_DEG,
                rng,
            )
        })
        .collect()
}

/// `epochs` consecutive collapsed epochs continuing the same trajectory
pub fn collapse_run(start_ts: u64, start_lat: f64, epochs: usize) -> Vec<Observation> {
    (0..epochs)
        .map(|i| {
            collapsed_observation(
                start_ts + i as u64 * EPOCH_MS,
                start_lat + i as f64 * LAT_STEP_DEG,
            )
        })
        .collect()
}

/// Sink keeping every event behind a shared handle
#[derive(Default)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<TelemetryEvent>>>,
}

impl RecordingSink {
    /// Handle kept by the test after the sink moves into the pipeline
    pub fn handle(&self) -> Rc<RefCell<Vec<TelemetryEvent>>> {
        Rc::clone(&self.events)
    }
}

impl TelemetrySink for RecordingSink {
    fn record(&mut self, event: &TelemetryEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Counts events of a given kind in a recorded stream
pub fn count_kind(events: &[TelemetryEvent], kind: &str) -> usize {
    events.iter().filter(|e| e.kind() == kind).count()
}

/// Planner recording requests and replaying scripted completions
#[derive(Default)]
pub struct ScriptedPlanner {
    requests: Rc<RefCell<Vec<RouteRequest>>>,
    completions: Rc<RefCell<Vec<Result<FallbackRoute, RouteError>>>>,
}

impl ScriptedPlanner {
    pub fn requests(&self) -> Rc<RefCell<Vec<RouteRequest>>> {
        Rc::clone(&self.requests)
    }

    /// Handle for queueing completions after the planner has moved
    pub fn completions(&self) -> Rc<RefCell<Vec<Result<FallbackRoute, RouteError>>>> {
        Rc::clone(&self.completions)
    }
}

impl RoutePlanner for ScriptedPlanner {
    fn request(&mut self, request: RouteRequest) {
        self.requests.borrow_mut().push(request);
    }

    fn poll(&mut self) -> Option<Result<FallbackRoute, RouteError>> {
        self.completions.borrow_mut().pop()
    }
}

/// Pipeline with instrumented doubles at both seams
pub type TestPipeline = SpoofingPipeline<8, ScriptedPlanner, RecordingSink>;

/// Handles into the doubles, kept after they move into the pipeline
pub struct TestRig {
    pub events: Rc<RefCell<Vec<TelemetryEvent>>>,
    pub requests: Rc<RefCell<Vec<RouteRequest>>>,
    pub completions: Rc<RefCell<Vec<Result<FallbackRoute, RouteError>>>>,
}

/// Builds a pipeline wired to a recording sink and a scripted planner
pub fn instrumented(config: DetectionConfig) -> (TestPipeline, TestRig) {
    let sink = RecordingSink::default();
    let planner = ScriptedPlanner::default();
    let rig = TestRig {
        events: sink.handle(),
        requests: planner.requests(),
        completions: planner.completions(),
    };
    let pipeline = SpoofingPipeline::builder(config)
        .planner(planner)
        .sink(sink)
        .build()
        .expect("test configuration validates");
    (pipeline, rig)
}
