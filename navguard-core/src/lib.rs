//! GNSS spoofing detection and safe fallback for NavGuard
//!
//! Per-epoch decision pipeline for a moving receiver: raw observations
//! are reduced to feature records, judged by two independent detectors
//! (signal-power statistics and kinematic plausibility), fused into a
//! confidence-scored spoofing alert, and fed to a mode state machine
//! that degrades from Normal through Suspect into SafeFallback and
//! requests route recalculation from the last trusted fix.
//!
//! Key constraints:
//! - `no_std`-capable core, no heap allocation in the decision loop
//! - deterministic: no randomness, no wall-clock reads in the loop
//! - SafeFallback exits only on an explicit external recovery signal
//!
//! ```rust
//! use navguard_core::{
//!     config::DetectionConfig, observation::Observation,
//!     pipeline::SpoofingPipeline,
//! };
//!
//! let mut pipeline: SpoofingPipeline<8, _, _> =
//!     SpoofingPipeline::builder(DetectionConfig::default())
//!         .build()
//!         .expect("default config validates");
//!
//! let obs = Observation::builder(1_000)
//!     .position(47.61, -122.33, 56.0)
//!     .velocity(4.2, 180.0)
//!     .satellite(7, 45.0, 62.0, 120.0)
//!     .build();
//!
//! let report = pipeline.process(obs).expect("valid observation");
//! assert!(report.gnss_trusted);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod config;
pub mod constants;
pub mod detectors;
pub mod errors;
pub mod fallback;
pub mod features;
pub mod fusion;
pub mod observation;
pub mod pipeline;
pub mod queue;
pub mod route;
pub mod stream;
pub mod telemetry;
pub mod time;

// Public API
pub use config::DetectionConfig;
pub use detectors::{Detector, DetectorVerdict, KinematicDetector, SnrDetector};
pub use errors::{PipelineError, PipelineResult};
pub use fallback::{FallbackMachine, FallbackState, RecoverySignal, TrustedFix};
pub use fusion::{ConfidenceScore, FusionEngine, SpoofingAlert};
pub use observation::Observation;
pub use pipeline::{EpochReport, PipelineStats, SpoofingPipeline};
pub use route::{FallbackRoute, RoutePlanner};
pub use telemetry::{TelemetryEvent, TelemetrySink};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
