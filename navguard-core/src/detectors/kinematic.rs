//! Speed/Kinematic Detector
//!
//! ## Overview
//!
//! Physical-plausibility checks on the receiver's motion. A spoofer can
//! fabricate any position it likes, but the fabricated trajectory must
//! still obey the platform's physics to go unnoticed: a multirotor does
//! not do 80 m/s, does not gain 30 m/s in one second, and does not
//! teleport 200 m between epochs. Three checks, in precedence order:
//!
//! 1. `PositionJump` — displacement at or over the jump threshold **and**
//!    implied average speed over the bound. The and-condition is the gap
//!    defence: a large displacement across a long quiet period is
//!    legitimate, so raw displacement alone never flags.
//! 2. `SpeedExceeded` — derived or reported ground speed over the bound.
//! 3. `AccelerationExceeded` — reported-speed change rate over the bound.
//!
//! ## Warm-up and Gaps
//!
//! The detector is a pure function of the current [`FeatureRecord`]
//! except for one counter: epochs settle the detector, and until the
//! configured number of consecutive in-bounds epochs has been seen the
//! verdict is `Stabilizing`. Receivers produce wild fixes while
//! acquiring; arming the checks immediately would alarm on every cold
//! start. An epoch gap marks history stale (`StaleHistory`, unflagged)
//! and restarts the warm-up, since the fix after a long silence is
//! another acquisition.

use libm::fabsf;

use crate::config::KinematicConfig;
use crate::features::FeatureRecord;
use crate::fusion::ConfidenceScore;

use super::{Detector, DetectorId, DetectorVerdict, VerdictReason};

/// Physical-plausibility detector
pub struct KinematicDetector {
    config: KinematicConfig,
    /// Consecutive in-bounds epochs since start or the last gap
    settled_epochs: u8,
}

impl KinematicDetector {
    /// Creates a detector in its warm-up state
    pub fn new(config: KinematicConfig) -> Self {
        Self {
            config,
            settled_epochs: 0,
        }
    }

    /// True once warm-up has completed and verdicts are armed
    pub fn is_armed(&self) -> bool {
        self.settled_epochs >= self.config.stabilization_epochs
    }

    fn assess_record(&mut self, record: &FeatureRecord) -> DetectorVerdict {
        if record.gap {
            self.settled_epochs = 0;
            return DetectorVerdict {
                detector: DetectorId::Kinematic,
                flagged: false,
                confidence: ConfidenceScore::ZERO,
                reason: VerdictReason::StaleHistory,
            };
        }

        let (derived, accel, displacement) = match (
            record.derived_speed_mps,
            record.accel_mps2,
            record.displacement_m,
        ) {
            (Some(derived), Some(accel), Some(displacement)) => (derived, accel, displacement),
            _ => return DetectorVerdict::insufficient(DetectorId::Kinematic),
        };

        // Receiver-reported speed is as binding as the derived one
        let speed = if record.reported_speed_mps > derived {
            record.reported_speed_mps
        } else {
            derived
        };

        let jump =
            displacement >= self.config.jump_threshold_m && derived > self.config.max_speed_mps;
        let speeding = speed > self.config.max_speed_mps;
        let accelerating = fabsf(accel) > self.config.max_accel_mps2;
        let in_bounds = !(jump || speeding || accelerating);

        if !self.is_armed() {
            if in_bounds {
                self.settled_epochs += 1;
            } else {
                self.settled_epochs = 0;
            }
            return DetectorVerdict::stabilizing(DetectorId::Kinematic);
        }

        if jump {
            let confidence = ConfidenceScore::from_ratio(derived, self.config.max_speed_mps);
            return DetectorVerdict::raise(
                DetectorId::Kinematic,
                VerdictReason::PositionJump,
                confidence,
            );
        }

        if speeding {
            let confidence = ConfidenceScore::from_ratio(speed, self.config.max_speed_mps);
            return DetectorVerdict::raise(
                DetectorId::Kinematic,
                VerdictReason::SpeedExceeded,
                confidence,
            );
        }

        if accelerating {
            let confidence = ConfidenceScore::from_ratio(fabsf(accel), self.config.max_accel_mps2);
            return DetectorVerdict::raise(
                DetectorId::Kinematic,
                VerdictReason::AccelerationExceeded,
                confidence,
            );
        }

        DetectorVerdict::clear(DetectorId::Kinematic)
    }
}

impl Detector for KinematicDetector {
    fn id(&self) -> DetectorId {
        DetectorId::Kinematic
    }

    fn assess(&mut self, record: &FeatureRecord) -> DetectorVerdict {
        self.assess_record(record)
    }

    fn reset(&mut self) {
        self.settled_epochs = 0;
    }
}
