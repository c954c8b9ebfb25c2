//! Spoofing Detectors
//!
//! ## Overview
//!
//! Two independent detectors examine every accepted epoch's
//! [`FeatureRecord`](crate::features::FeatureRecord) and emit one
//! [`DetectorVerdict`] each:
//!
//! - [`snr::SnrDetector`] — signal-statistics checks: collapsed
//!   cross-satellite C/N0 variance, power-vs-elevation residuals, sudden
//!   mean-power steps, constellation churn. Owns the only sliding window
//!   in the pipeline.
//! - [`kinematic::KinematicDetector`] — physical-plausibility checks:
//!   speed, acceleration, and discontinuous position jumps against the
//!   platform's bounds.
//!
//! Verdicts are small immutable values; the fusion engine combines them
//! without reaching back into detector state. A detector that cannot
//! judge an epoch says so explicitly (`InsufficientData`, `Stabilizing`,
//! `StaleHistory`) instead of reporting a clean epoch it never examined.
//!
//! ## Confidence Convention
//!
//! Flagged verdicts carry a confidence in [0, 1] that scales with how far
//! the statistic sits beyond its bound: 0.5 at the bound, saturating to
//! 1.0 at twice the bound (see
//! [`ConfidenceScore::from_ratio`](crate::fusion::ConfidenceScore)).
//! Unflagged verdicts always carry confidence 0.

pub mod kinematic;
pub mod snr;

pub use kinematic::KinematicDetector;
pub use snr::{SnrDetector, SnrSample};

use crate::features::FeatureRecord;
use crate::fusion::ConfidenceScore;

/// Identifies which detector produced a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DetectorId {
    /// Signal-statistics detector
    Snr,
    /// Physical-plausibility detector
    Kinematic,
}

impl DetectorId {
    /// Stable lower-case label for logs and telemetry
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Snr => "snr",
            Self::Kinematic => "kinematic",
        }
    }
}

/// Why a verdict carries its flag (or doesn't)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VerdictReason {
    /// Nothing anomalous this epoch
    Clear,
    /// Too few usable satellites, or no predecessor epoch to difference
    InsufficientData,
    /// Warm-up: not enough settled history to judge yet
    Stabilizing,
    /// Cross-satellite C/N0 variance collapsed below threshold
    LowVariance,
    /// Too many satellites with strongly negative power-vs-elevation
    /// residual
    ElevationResidual,
    /// Sudden step in mean C/N0 versus the previous epoch
    PowerStep,
    /// Tracked constellation replaced faster than orbital geometry allows
    ConstellationChurn,
    /// Derived or reported ground speed exceeds the platform bound
    SpeedExceeded,
    /// Ground-speed change rate exceeds the platform bound
    AccelerationExceeded,
    /// Discontinuous displacement with implausible implied velocity
    PositionJump,
    /// Epoch gap too large; kinematic history is stale
    StaleHistory,
}

impl VerdictReason {
    /// Stable label for logs and telemetry
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::InsufficientData => "insufficient_data",
            Self::Stabilizing => "stabilizing",
            Self::LowVariance => "low_variance",
            Self::ElevationResidual => "elevation_residual",
            Self::PowerStep => "power_step",
            Self::ConstellationChurn => "constellation_churn",
            Self::SpeedExceeded => "speed_exceeded",
            Self::AccelerationExceeded => "acceleration_exceeded",
            Self::PositionJump => "position_jump",
            Self::StaleHistory => "stale_history",
        }
    }
}

/// One detector's judgement of one epoch
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DetectorVerdict {
    /// Which detector judged
    pub detector: DetectorId,
    /// True when the detector considers the epoch anomalous
    pub flagged: bool,
    /// Strength of the judgement, 0 when unflagged
    pub confidence: ConfidenceScore,
    /// What drove the judgement
    pub reason: VerdictReason,
}

impl DetectorVerdict {
    /// Clean verdict: nothing anomalous
    pub const fn clear(detector: DetectorId) -> Self {
        Self {
            detector,
            flagged: false,
            confidence: ConfidenceScore::ZERO,
            reason: VerdictReason::Clear,
        }
    }

    /// Degraded verdict: the detector lacked the data to judge
    pub const fn insufficient(detector: DetectorId) -> Self {
        Self {
            detector,
            flagged: false,
            confidence: ConfidenceScore::ZERO,
            reason: VerdictReason::InsufficientData,
        }
    }

    /// Warm-up verdict: judgement suppressed until history settles
    pub const fn stabilizing(detector: DetectorId) -> Self {
        Self {
            detector,
            flagged: false,
            confidence: ConfidenceScore::ZERO,
            reason: VerdictReason::Stabilizing,
        }
    }

    /// Flagged verdict with the given reason and confidence
    pub const fn raise(
        detector: DetectorId,
        reason: VerdictReason,
        confidence: ConfidenceScore,
    ) -> Self {
        Self {
            detector,
            flagged: true,
            confidence,
            reason,
        }
    }

    /// True when the verdict neither flags nor reports degradation
    pub const fn is_clear(&self) -> bool {
        matches!(self.reason, VerdictReason::Clear)
    }

    /// True when the verdict reports a data shortfall rather than a
    /// judgement
    pub const fn is_degraded(&self) -> bool {
        matches!(
            self.reason,
            VerdictReason::InsufficientData | VerdictReason::Stabilizing | VerdictReason::StaleHistory
        )
    }
}

/// Per-epoch judgement seam shared by both detectors
///
/// Detectors are stateless apart from explicitly modeled history (the SNR
/// sliding window, the kinematic warm-up counter); `reset` restores the
/// just-constructed state for deterministic replay.
pub trait Detector {
    /// Which detector this is
    fn id(&self) -> DetectorId;

    /// Judges one epoch
    fn assess(&mut self, record: &FeatureRecord) -> DetectorVerdict;

    /// Clears retained history
    fn reset(&mut self);
}
