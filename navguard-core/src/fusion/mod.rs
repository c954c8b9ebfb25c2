//! Fusion & Decision Engine
//!
//! ## Overview
//!
//! Combines the per-epoch [`DetectorVerdict`]s into one
//! [`SpoofingAlert`]. Two concerns live here and nowhere else:
//!
//! - **Agreement.** A single detector can be fooled by environment
//!   (urban canyon multipath collapses variance; a parking-garage exit
//!   looks like a power step). The alert is only flagged when one
//!   detector is highly confident on its own, or both detectors concur
//!   at moderate confidence. Below agreement the alert carries
//!   confidence zero, so downstream consumers never see a half-signal.
//! - **Persistence.** Spoofing is sustained by nature; glitches are not.
//!   A counter tracks consecutive epochs with at least one flagged
//!   detector verdict and resets on the first epoch without one. An
//!   alert becomes *actionable* only when it is flagged, its fused
//!   confidence reaches the actionable threshold, and the counter has
//!   exceeded the persistence threshold.
//!
//! The engine is pure over its inputs plus the one counter; no detector
//! state is shared, and replaying the same verdict sequence reproduces
//! the same alerts.
//!
//! ## Fused Confidence
//!
//! Weighted mean of the flagged verdicts' confidences, normalized over
//! the contributing weights. One flagged detector at 0.8 fuses to 0.8; a
//! pair at (0.8, 0.4) with weights (0.6, 0.4) fuses to 0.64. Weights
//! come from [`FusionConfig`](crate::config::FusionConfig).

pub mod confidence;

pub use confidence::ConfidenceScore;

use heapless::Vec;

use crate::config::FusionConfig;
use crate::constants::MAX_VERDICTS;
use crate::detectors::{DetectorId, DetectorVerdict};
use crate::time::Timestamp;

/// Fused per-epoch spoofing judgement
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpoofingAlert {
    /// Epoch this alert judges
    pub timestamp: Timestamp,
    /// Fused confidence; zero unless the agreement rule passed
    pub confidence: ConfidenceScore,
    /// True when the agreement rule passed
    pub flagged: bool,
    /// True when flagged, confident enough, and persistent enough for
    /// the state machine to act on
    pub actionable: bool,
    /// The flagged detector verdicts backing this alert
    pub verdicts: Vec<DetectorVerdict, MAX_VERDICTS>,
    /// Consecutive epochs (including this one) with a flagged verdict
    pub consecutive_flagged: u8,
}

impl SpoofingAlert {
    /// True when no detector flagged this epoch
    pub fn clean(&self) -> bool {
        self.consecutive_flagged == 0
    }
}

/// Weighted-agreement fusion with a persistence counter
pub struct FusionEngine {
    config: FusionConfig,
    consecutive_flagged: u8,
}

impl FusionEngine {
    /// Creates an engine with the persistence counter at zero
    pub fn new(config: FusionConfig) -> Self {
        Self {
            config,
            consecutive_flagged: 0,
        }
    }

    /// Current persistence counter value
    pub fn consecutive_flagged(&self) -> u8 {
        self.consecutive_flagged
    }

    /// Restores the just-constructed state for deterministic replay
    pub fn reset(&mut self) {
        self.consecutive_flagged = 0;
    }

    fn weight(&self, detector: DetectorId) -> f32 {
        match detector {
            DetectorId::Snr => self.config.snr_weight,
            DetectorId::Kinematic => self.config.kinematic_weight,
        }
    }

    /// Fuses one epoch's verdicts into an alert
    pub fn fuse(&mut self, timestamp: Timestamp, verdicts: &[DetectorVerdict]) -> SpoofingAlert {
        let mut contributing: Vec<DetectorVerdict, MAX_VERDICTS> = Vec::new();
        for verdict in verdicts.iter().filter(|v| v.flagged) {
            // Capacity covers every detector; an overflow would mean a
            // duplicated detector id upstream
            let _ = contributing.push(*verdict);
        }

        self.consecutive_flagged = if contributing.is_empty() {
            0
        } else {
            self.consecutive_flagged.saturating_add(1)
        };

        let high_single = ConfidenceScore::from_float(self.config.high_single_confidence);
        let moderate = ConfidenceScore::from_float(self.config.moderate_agree_confidence);
        let singly_confident = contributing.iter().any(|v| v.confidence.meets(high_single));
        let concurring = contributing
            .iter()
            .filter(|v| v.confidence.meets(moderate))
            .count()
            >= 2;
        let flagged = singly_confident || concurring;

        let confidence = if flagged {
            let mut weighted = 0.0f32;
            let mut total = 0.0f32;
            for verdict in &contributing {
                let w = self.weight(verdict.detector);
                weighted += w * verdict.confidence.as_float();
                total += w;
            }
            if total > 0.0 {
                ConfidenceScore::from_float(weighted / total)
            } else {
                ConfidenceScore::ZERO
            }
        } else {
            ConfidenceScore::ZERO
        };

        let actionable = flagged
            && confidence.meets(ConfidenceScore::from_float(self.config.actionable_confidence))
            && self.consecutive_flagged > self.config.persistence_epochs;

        SpoofingAlert {
            timestamp,
            confidence,
            flagged,
            actionable,
            verdicts: contributing,
            consecutive_flagged: self.consecutive_flagged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionConfig;
    use crate::detectors::VerdictReason;

    fn engine() -> FusionEngine {
        FusionEngine::new(DetectionConfig::default().fusion)
    }

    fn snr(confidence: f32) -> DetectorVerdict {
        DetectorVerdict::raise(
            DetectorId::Snr,
            VerdictReason::LowVariance,
            ConfidenceScore::from_float(confidence),
        )
    }

    fn kinematic(confidence: f32) -> DetectorVerdict {
        DetectorVerdict::raise(
            DetectorId::Kinematic,
            VerdictReason::SpeedExceeded,
            ConfidenceScore::from_float(confidence),
        )
    }

    #[test]
    fn clean_verdicts_fuse_to_silence() {
        let mut engine = engine();
        let alert = engine.fuse(
            1_000,
            &[
                DetectorVerdict::clear(DetectorId::Snr),
                DetectorVerdict::clear(DetectorId::Kinematic),
            ],
        );

        assert!(!alert.flagged);
        assert!(!alert.actionable);
        assert_eq!(alert.confidence, ConfidenceScore::ZERO);
        assert!(alert.clean());
        assert!(alert.verdicts.is_empty());
    }

    #[test]
    fn degraded_verdicts_do_not_build_persistence() {
        let mut engine = engine();
        for ts in 0..5u64 {
            let alert = engine.fuse(
                ts,
                &[
                    DetectorVerdict::insufficient(DetectorId::Snr),
                    DetectorVerdict::stabilizing(DetectorId::Kinematic),
                ],
            );
            assert!(alert.clean());
            assert_eq!(alert.consecutive_flagged, 0);
        }
    }

    #[test]
    fn lone_high_confidence_flags() {
        let mut engine = engine();
        let alert = engine.fuse(
            1_000,
            &[snr(0.8), DetectorVerdict::clear(DetectorId::Kinematic)],
        );

        assert!(alert.flagged);
        // Normalized over the single contributor: fused equals its own
        assert!((alert.confidence.as_float() - 0.8).abs() < 1e-3);
        assert_eq!(alert.verdicts.len(), 1);
    }

    #[test]
    fn lone_moderate_confidence_stays_unflagged_but_counts() {
        let mut engine = engine();
        let alert = engine.fuse(
            1_000,
            &[snr(0.4), DetectorVerdict::clear(DetectorId::Kinematic)],
        );

        assert!(!alert.flagged);
        assert_eq!(alert.confidence, ConfidenceScore::ZERO);
        // The flagged detector verdict still feeds persistence
        assert_eq!(alert.consecutive_flagged, 1);
        assert!(!alert.clean());
    }

    #[test]
    fn moderate_agreement_flags_with_weighted_mean() {
        let mut engine = engine();
        let alert = engine.fuse(1_000, &[snr(0.5), kinematic(0.4)]);

        assert!(alert.flagged);
        // (0.6*0.5 + 0.4*0.4) / 1.0 = 0.46
        assert!((alert.confidence.as_float() - 0.46).abs() < 1e-3);
        assert_eq!(alert.verdicts.len(), 2);
    }

    #[test]
    fn actionable_requires_confidence_and_persistence() {
        let mut engine = engine();

        // Default persistence threshold is 3: epochs 1-3 flagged but not
        // actionable, epoch 4 crosses
        for ts in 1..=3u64 {
            let alert = engine.fuse(ts, &[snr(0.8)]);
            assert!(alert.flagged);
            assert!(!alert.actionable, "epoch {ts}");
        }
        let alert = engine.fuse(4, &[snr(0.8)]);
        assert!(alert.actionable);
        assert_eq!(alert.consecutive_flagged, 4);
    }

    #[test]
    fn persistent_but_moderate_never_turns_actionable() {
        let mut engine = engine();
        for ts in 1..=10u64 {
            let alert = engine.fuse(ts, &[snr(0.4), kinematic(0.35)]);
            assert!(alert.flagged);
            assert!(!alert.actionable, "fused stays below actionable");
        }
    }

    #[test]
    fn one_clean_epoch_resets_persistence() {
        let mut engine = engine();
        engine.fuse(1, &[snr(0.8)]);
        engine.fuse(2, &[snr(0.8)]);
        assert_eq!(engine.consecutive_flagged(), 2);

        let alert = engine.fuse(3, &[DetectorVerdict::clear(DetectorId::Snr)]);
        assert_eq!(alert.consecutive_flagged, 0);
        assert!(alert.clean());

        // Counting starts over afterwards
        let alert = engine.fuse(4, &[snr(0.8)]);
        assert_eq!(alert.consecutive_flagged, 1);
        assert!(!alert.actionable);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut engine = engine();
        for ts in 1..=5u64 {
            engine.fuse(ts, &[snr(0.8)]);
        }
        engine.reset();
        assert_eq!(engine.consecutive_flagged(), 0);
        let alert = engine.fuse(6, &[snr(0.8)]);
        assert!(!alert.actionable);
    }
}
