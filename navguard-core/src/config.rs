//! Detection Configuration
//!
//! ## Overview
//!
//! Every tunable in the pipeline lives in this tree; nothing numeric is
//! buried in detector code. Defaults come from the documented
//! [`constants`](crate::constants) module and describe a small
//! multirotor at a 1 Hz epoch rate; [`DetectionConfig::pedestrian`]
//! adjusts the kinematic bounds for a hand-carried receiver.
//!
//! Configurations deserialize with `serde` (behind the `serde` feature,
//! with per-field defaults so partial files work) and are checked by
//! [`DetectionConfig::validate`] before a pipeline accepts them:
//! threshold ordering, positive bounds, and non-degenerate weights. A
//! configuration that validates cannot later fault the decision loop.

use thiserror_no_std::Error;

use crate::constants;

/// A named constraint violation found by `validate`
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(pub &'static str);

/// SNR detector tuning
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SnrConfig {
    /// Minimum usable satellites for signal statistics
    pub min_satellites: u8,
    /// C/N0 floor below which a satellite is ignored (dB-Hz)
    pub usable_floor_dbhz: f32,
    /// Expected C/N0 at the horizon in the elevation model (dB-Hz)
    pub model_floor_dbhz: f32,
    /// Expected C/N0 rise from horizon to zenith (dB-Hz)
    pub model_span_dbhz: f32,
    /// Cross-satellite variance below this is a collapse (dB-Hz²)
    pub variance_threshold_dbhz2: f32,
    /// Epoch run scaling the collapse confidence curve
    pub sustain_epochs: u8,
    /// Negative residual beyond this flags a satellite (dB-Hz)
    pub residual_bound_dbhz: f32,
    /// Fraction of flagged satellites that flags the epoch
    pub residual_fraction_bound: f32,
    /// Absolute mean-power step bound (dB-Hz)
    pub step_bound_dbhz: f32,
    /// Relative mean-power step bound (fraction of previous mean)
    pub step_bound_rel: f32,
    /// PRNs appeared-plus-lost in one epoch that flags churn
    pub churn_bound: u8,
}

impl Default for SnrConfig {
    fn default() -> Self {
        Self {
            min_satellites: constants::MIN_USABLE_SATELLITES,
            usable_floor_dbhz: constants::CN0_USABLE_FLOOR_DBHZ,
            model_floor_dbhz: constants::CN0_MODEL_FLOOR_DBHZ,
            model_span_dbhz: constants::CN0_MODEL_SPAN_DBHZ,
            variance_threshold_dbhz2: constants::SNR_VARIANCE_THRESHOLD,
            sustain_epochs: constants::SNR_SUSTAIN_EPOCHS,
            residual_bound_dbhz: constants::RESIDUAL_BOUND_DBHZ,
            residual_fraction_bound: constants::RESIDUAL_FRACTION_BOUND,
            step_bound_dbhz: constants::CN0_STEP_BOUND_DBHZ,
            step_bound_rel: constants::CN0_STEP_BOUND_REL,
            churn_bound: constants::CONSTELLATION_CHURN_BOUND,
        }
    }
}

/// Kinematic detector tuning
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KinematicConfig {
    /// Maximum plausible ground speed for the platform (m/s)
    pub max_speed_mps: f32,
    /// Maximum plausible speed change rate (m/s²)
    pub max_accel_mps2: f32,
    /// Displacement at or over this is a candidate jump (m)
    pub jump_threshold_m: f32,
    /// Time delta beyond this marks kinematic history stale (ms)
    pub max_gap_ms: u32,
    /// In-bounds epochs required before verdicts arm
    pub stabilization_epochs: u8,
}

impl Default for KinematicConfig {
    fn default() -> Self {
        Self {
            max_speed_mps: constants::MULTIROTOR_MAX_SPEED_MPS,
            max_accel_mps2: constants::MAX_ACCELERATION_MPS2,
            jump_threshold_m: constants::POSITION_JUMP_THRESHOLD_M,
            max_gap_ms: constants::MAX_EPOCH_GAP_MS,
            stabilization_epochs: constants::STABILIZATION_EPOCHS,
        }
    }
}

/// Fusion and alert tuning
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FusionConfig {
    /// Weight of the SNR detector in fused confidence
    pub snr_weight: f32,
    /// Weight of the kinematic detector in fused confidence
    pub kinematic_weight: f32,
    /// A lone detector at or over this passes agreement
    pub high_single_confidence: f32,
    /// Two detectors each at or over this pass agreement
    pub moderate_agree_confidence: f32,
    /// Fused confidence moving Normal to Suspect
    pub watch_confidence: f32,
    /// Fused confidence eligible to act on (with persistence)
    pub actionable_confidence: f32,
    /// Single-epoch confidence that bypasses Suspect entirely
    pub emergency_confidence: f32,
    /// Consecutive flagged epochs that must be exceeded before an alert
    /// is actionable
    pub persistence_epochs: u8,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            snr_weight: constants::SNR_FUSION_WEIGHT,
            kinematic_weight: constants::KINEMATIC_FUSION_WEIGHT,
            high_single_confidence: constants::HIGH_SINGLE_CONFIDENCE,
            moderate_agree_confidence: constants::MODERATE_AGREE_CONFIDENCE,
            watch_confidence: constants::WATCH_CONFIDENCE,
            actionable_confidence: constants::ACTIONABLE_CONFIDENCE,
            emergency_confidence: constants::EMERGENCY_CONFIDENCE,
            persistence_epochs: constants::PERSISTENCE_EPOCHS,
        }
    }
}

/// State machine tuning
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FallbackConfig {
    /// Consecutive clean epochs taking Suspect back to Normal
    pub clean_epochs_to_normal: u8,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            clean_epochs_to_normal: constants::CLEAN_EPOCHS_TO_NORMAL,
        }
    }
}

/// Root configuration for the detection pipeline
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DetectionConfig {
    /// SNR detector tuning
    pub snr: SnrConfig,
    /// Kinematic detector tuning
    pub kinematic: KinematicConfig,
    /// Fusion and alert tuning
    pub fusion: FusionConfig,
    /// State machine tuning
    pub fallback: FallbackConfig,
}

impl DetectionConfig {
    /// Defaults for a small multirotor at a 1 Hz epoch rate
    pub fn multirotor() -> Self {
        Self::default()
    }

    /// Defaults for a hand-carried receiver
    ///
    /// Only the speed bound differs: walking platforms move slowly, so a
    /// tighter bound catches smaller fabricated displacements.
    pub fn pedestrian() -> Self {
        let mut config = Self::default();
        config.kinematic.max_speed_mps = constants::PEDESTRIAN_MAX_SPEED_MPS;
        config
    }

    /// Checks internal consistency
    ///
    /// Returns the first violated constraint. A configuration that
    /// passes cannot produce a division by zero or an unreachable
    /// threshold at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snr.min_satellites == 0 {
            return Err(ConfigError("minimum satellite count must be at least 1"));
        }
        if self.snr.sustain_epochs == 0 {
            return Err(ConfigError("sustain epochs must be at least 1"));
        }
        if self.snr.variance_threshold_dbhz2 <= 0.0 {
            return Err(ConfigError("variance threshold must be positive"));
        }
        if self.snr.usable_floor_dbhz < constants::CN0_MIN_DBHZ
            || self.snr.usable_floor_dbhz > constants::CN0_MAX_DBHZ
        {
            return Err(ConfigError("usable floor must sit inside the C/N0 range"));
        }
        if self.snr.residual_bound_dbhz <= 0.0 {
            return Err(ConfigError("residual bound must be positive"));
        }
        if self.snr.residual_fraction_bound <= 0.0 || self.snr.residual_fraction_bound > 1.0 {
            return Err(ConfigError("residual fraction bound must be in (0, 1]"));
        }
        if self.snr.churn_bound == 0 {
            return Err(ConfigError("churn bound must be at least 1"));
        }

        if self.kinematic.max_speed_mps <= 0.0 || self.kinematic.max_accel_mps2 <= 0.0 {
            return Err(ConfigError("kinematic bounds must be positive"));
        }
        if self.kinematic.jump_threshold_m <= 0.0 {
            return Err(ConfigError("jump threshold must be positive"));
        }
        if self.kinematic.max_gap_ms == 0 {
            return Err(ConfigError("maximum epoch gap must be positive"));
        }

        if self.fusion.snr_weight < 0.0
            || self.fusion.kinematic_weight < 0.0
            || self.fusion.snr_weight + self.fusion.kinematic_weight <= 0.0
        {
            return Err(ConfigError("fusion weights must be non-negative and not all zero"));
        }
        for (message, value) in [
            (
                "high-single confidence must be in [0, 1]",
                self.fusion.high_single_confidence,
            ),
            (
                "moderate-agree confidence must be in [0, 1]",
                self.fusion.moderate_agree_confidence,
            ),
            (
                "watch confidence must be in [0, 1]",
                self.fusion.watch_confidence,
            ),
            (
                "actionable confidence must be in [0, 1]",
                self.fusion.actionable_confidence,
            ),
            (
                "emergency confidence must be in [0, 1]",
                self.fusion.emergency_confidence,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError(message));
            }
        }
        if self.fusion.moderate_agree_confidence > self.fusion.high_single_confidence {
            return Err(ConfigError(
                "moderate-agree threshold must not exceed high-single",
            ));
        }
        if self.fusion.watch_confidence > self.fusion.actionable_confidence
            || self.fusion.actionable_confidence > self.fusion.emergency_confidence
        {
            return Err(ConfigError(
                "thresholds must order watch <= actionable <= emergency",
            ));
        }

        if self.fallback.clean_epochs_to_normal == 0 {
            return Err(ConfigError("clean-epoch count must be at least 1"));
        }

        Ok(())
    }
}
