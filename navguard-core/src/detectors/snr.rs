//! SNR Detector
//!
//! ## Overview
//!
//! Signal-statistics spoofing checks over the per-epoch
//! [`FeatureRecord`]. A single-emitter spoofer leaves two fingerprints in
//! the C/N0 table: the satellite-to-satellite spread collapses (every
//! "satellite" is really one transmitter), and received power stops
//! tracking elevation geometry. Two supplementary checks catch the capture
//! moment itself: a step in mean power when the spoofer overpowers the
//! live sky, and a burst of constellation churn when tracked PRNs are
//! swapped for counterfeit ones.
//!
//! ## Precedence
//!
//! Exactly one verdict per epoch, first match wins:
//!
//! 1. fewer usable satellites than the minimum — insufficient data;
//! 2. window not yet filled to the sustain count — stabilizing;
//! 3. variance below threshold — `LowVariance`, confidence grows with the
//!    trailing run of collapsed epochs;
//! 4. flagged-residual fraction at or over its bound — `ElevationResidual`;
//! 5. mean-power step at or over its bound — `PowerStep`;
//! 6. constellation churn at or over its bound — `ConstellationChurn`;
//! 7. otherwise clear.
//!
//! ## Window Discipline
//!
//! The detector owns the pipeline's only sliding window, a
//! [`WindowBuffer`] of per-epoch [`SnrSample`]s. The low-variance run is
//! recomputed from window contents each epoch (trailing scan), so there is
//! no hidden counter to drift. An epoch gap clears the window: consecutive
//! -epoch statistics must not span a discontinuity. A short run scores low
//! confidence; the run must approach twice the sustain count before a
//! lone variance collapse can carry an actionable score, which is how
//! sustained-anomaly gating is expressed without suppressing early
//! evidence from the fusion persistence counter.

use crate::buffer::WindowBuffer;
use crate::config::SnrConfig;
use crate::features::FeatureRecord;
use crate::fusion::ConfidenceScore;

use super::{Detector, DetectorId, DetectorVerdict, VerdictReason};

/// Signal-statistics slice of one epoch kept in the sliding window
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SnrSample {
    /// Cross-satellite C/N0 variance (dB-Hz²)
    pub variance_dbhz2: f32,
    /// True when the epoch had at least the minimum usable satellites
    pub usable: bool,
}

/// Signal-statistics detector with a compile-time window length
pub struct SnrDetector<const W: usize = { crate::constants::DEFAULT_WINDOW_EPOCHS }> {
    config: SnrConfig,
    window: WindowBuffer<SnrSample, W>,
}

impl<const W: usize> SnrDetector<W> {
    /// Creates a detector with an empty window
    pub fn new(config: SnrConfig) -> Self {
        Self {
            config,
            window: WindowBuffer::new(),
        }
    }

    /// Current window fill
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Trailing run of windowed epochs with collapsed variance
    ///
    /// Counts back from the newest sample while variance stays below
    /// threshold and the epoch had enough satellites to trust its
    /// statistics.
    fn trailing_collapse_run(&self) -> usize {
        let mut run = 0;
        for index in (0..self.window.len()).rev() {
            match self.window.get(index) {
                Some(sample)
                    if sample.usable
                        && sample.variance_dbhz2 < self.config.variance_threshold_dbhz2 =>
                {
                    run += 1;
                }
                _ => break,
            }
        }
        run
    }

    fn assess_record(&mut self, record: &FeatureRecord) -> DetectorVerdict {
        // A gap breaks epoch continuity; run statistics restart after it
        if record.gap {
            self.window.clear();
        }

        let usable = record.usable_sats >= self.config.min_satellites;
        self.window.push(SnrSample {
            variance_dbhz2: record.cn0_variance_dbhz2,
            usable,
        });

        if !usable {
            return DetectorVerdict::insufficient(DetectorId::Snr);
        }

        if self.window.len() < self.config.sustain_epochs as usize {
            return DetectorVerdict::stabilizing(DetectorId::Snr);
        }

        if record.cn0_variance_dbhz2 < self.config.variance_threshold_dbhz2 {
            let run = self.trailing_collapse_run();
            let margin = (self.config.variance_threshold_dbhz2 - record.cn0_variance_dbhz2)
                / self.config.variance_threshold_dbhz2;
            let run_ratio = run as f32 / (2.0 * self.config.sustain_epochs as f32);
            let confidence =
                ConfidenceScore::from_float(margin.clamp(0.0, 1.0) * run_ratio.clamp(0.0, 1.0));
            return DetectorVerdict::raise(DetectorId::Snr, VerdictReason::LowVariance, confidence);
        }

        if record.residual_fraction >= self.config.residual_fraction_bound {
            let confidence = ConfidenceScore::from_ratio(
                record.residual_fraction,
                self.config.residual_fraction_bound,
            );
            return DetectorVerdict::raise(
                DetectorId::Snr,
                VerdictReason::ElevationResidual,
                confidence,
            );
        }

        if let Some(step) = record.cn0_step_dbhz {
            // Relative bound is anchored to the previous epoch's mean
            let previous_mean = record.cn0_mean_dbhz - step;
            let bound = self
                .config
                .step_bound_dbhz
                .max(self.config.step_bound_rel * previous_mean);
            if bound > 0.0 && step >= bound {
                let confidence = ConfidenceScore::from_ratio(step, bound);
                return DetectorVerdict::raise(
                    DetectorId::Snr,
                    VerdictReason::PowerStep,
                    confidence,
                );
            }
        }

        if let Some(churn) = record.constellation_churn {
            if churn >= self.config.churn_bound {
                let confidence =
                    ConfidenceScore::from_ratio(churn as f32, self.config.churn_bound as f32);
                return DetectorVerdict::raise(
                    DetectorId::Snr,
                    VerdictReason::ConstellationChurn,
                    confidence,
                );
            }
        }

        DetectorVerdict::clear(DetectorId::Snr)
    }
}

impl<const W: usize> Detector for SnrDetector<W> {
    fn id(&self) -> DetectorId {
        DetectorId::Snr
    }

    fn assess(&mut self, record: &FeatureRecord) -> DetectorVerdict {
        self.assess_record(record)
    }

    fn reset(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionConfig;
    use crate::time::Timestamp;

    fn detector() -> SnrDetector<8> {
        SnrDetector::new(DetectionConfig::default().snr)
    }

    fn record(timestamp: Timestamp, variance: f32) -> FeatureRecord {
        FeatureRecord {
            timestamp,
            time_delta_ms: Some(1_000),
            gap: false,
            total_sats: 8,
            usable_sats: 8,
            cn0_mean_dbhz: 45.0,
            cn0_variance_dbhz2: variance,
            residual_flagged: 0,
            residual_fraction: 0.0,
            cn0_step_dbhz: Some(0.0),
            constellation_churn: Some(0),
            reported_speed_mps: 5.0,
            derived_speed_mps: Some(5.0),
            accel_mps2: Some(0.0),
            displacement_m: Some(5.0),
        }
    }

    fn warm_up(detector: &mut SnrDetector<8>, epochs: u64) {
        for i in 0..epochs {
            let verdict = detector.assess(&record(i * 1_000, 9.0));
            assert!(!verdict.flagged);
        }
    }

    #[test]
    fn insufficient_satellites_never_report_clean() {
        let mut det = detector();
        let mut rec = record(0, 9.0);
        rec.usable_sats = 3;

        let verdict = det.assess(&rec);
        assert!(!verdict.flagged);
        assert_eq!(verdict.reason, VerdictReason::InsufficientData);
        assert_eq!(verdict.confidence, ConfidenceScore::ZERO);
    }

    #[test]
    fn stabilizes_until_window_covers_sustain() {
        let mut det = detector();
        // Default sustain is 3: two stabilizing epochs, then judgement
        assert_eq!(det.assess(&record(0, 9.0)).reason, VerdictReason::Stabilizing);
        assert_eq!(det.assess(&record(1_000, 9.0)).reason, VerdictReason::Stabilizing);
        assert_eq!(det.assess(&record(2_000, 9.0)).reason, VerdictReason::Clear);
    }

    #[test]
    fn healthy_variance_stays_clear() {
        let mut det = detector();
        warm_up(&mut det, 8);
        let verdict = det.assess(&record(9_000, 8.5));
        assert!(verdict.is_clear());
    }

    #[test]
    fn collapse_confidence_grows_with_run() {
        let mut det = detector();
        warm_up(&mut det, 4);

        // Collapse begins after a clean window: run counts 1, 2, 3...
        let v1 = det.assess(&record(5_000, 0.1));
        assert!(v1.flagged);
        assert_eq!(v1.reason, VerdictReason::LowVariance);
        let v2 = det.assess(&record(6_000, 0.1));
        let v3 = det.assess(&record(7_000, 0.1));
        let v4 = det.assess(&record(8_000, 0.1));

        assert!(v1.confidence < v2.confidence);
        assert!(v2.confidence < v3.confidence);
        assert!(v3.confidence < v4.confidence);
        // margin 0.975, run 4 of 2*3 sustain: ~0.65
        assert!((v4.confidence.as_float() - 0.65).abs() < 0.01);
    }

    #[test]
    fn gap_restarts_the_run() {
        let mut det = detector();
        warm_up(&mut det, 4);
        for i in 0..3u64 {
            det.assess(&record(5_000 + i * 1_000, 0.1));
        }

        let mut gapped = record(60_000, 0.1);
        gapped.gap = true;
        gapped.time_delta_ms = Some(52_000);
        let verdict = det.assess(&gapped);

        // Window cleared: back to warm-up despite collapsed variance
        assert_eq!(verdict.reason, VerdictReason::Stabilizing);
        assert!(!verdict.flagged);
    }

    #[test]
    fn residual_fraction_flags_when_variance_is_healthy() {
        let mut det = detector();
        warm_up(&mut det, 4);

        let mut rec = record(5_000, 8.0);
        rec.residual_flagged = 5;
        rec.residual_fraction = 0.625;
        let verdict = det.assess(&rec);

        assert!(verdict.flagged);
        assert_eq!(verdict.reason, VerdictReason::ElevationResidual);
        // 0.625 against a 0.5 bound: 0.625 confidence
        assert!((verdict.confidence.as_float() - 0.625).abs() < 0.01);
    }

    #[test]
    fn variance_collapse_outranks_residuals() {
        let mut det = detector();
        warm_up(&mut det, 4);

        let mut rec = record(5_000, 0.1);
        rec.residual_fraction = 0.9;
        let verdict = det.assess(&rec);
        assert_eq!(verdict.reason, VerdictReason::LowVariance);
    }

    #[test]
    fn power_step_uses_larger_of_absolute_and_relative_bound() {
        let mut det = detector();
        warm_up(&mut det, 4);

        // Previous mean 20: relative bound 5 loses to absolute bound 6
        let mut rec = record(5_000, 8.0);
        rec.cn0_mean_dbhz = 28.0;
        rec.cn0_step_dbhz = Some(8.0);
        let verdict = det.assess(&rec);
        assert!(verdict.flagged);
        assert_eq!(verdict.reason, VerdictReason::PowerStep);

        // Previous mean 48: relative bound 12 dominates, step 8 passes
        let mut det = detector();
        warm_up(&mut det, 4);
        let mut rec = record(5_000, 8.0);
        rec.cn0_mean_dbhz = 56.0;
        rec.cn0_step_dbhz = Some(8.0);
        let verdict = det.assess(&rec);
        assert!(!verdict.flagged);
    }

    #[test]
    fn constellation_churn_flags_at_bound() {
        let mut det = detector();
        warm_up(&mut det, 4);

        let mut rec = record(5_000, 8.0);
        rec.constellation_churn = Some(6);
        let verdict = det.assess(&rec);

        assert!(verdict.flagged);
        assert_eq!(verdict.reason, VerdictReason::ConstellationChurn);
        // 6 against a bound of 4: 0.75
        assert!((verdict.confidence.as_float() - 0.75).abs() < 0.01);
    }

    #[test]
    fn reset_clears_the_window() {
        let mut det = detector();
        warm_up(&mut det, 5);
        det.reset();
        assert_eq!(det.window_len(), 0);
        assert_eq!(det.assess(&record(9_000, 0.1)).reason, VerdictReason::Stabilizing);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Healthy statistics never flag, whatever the jitter
            #[test]
            fn in_bounds_epochs_never_flag(
                variances in proptest::collection::vec(4.5f32..25.0, 1..30),
                mean in 35.0f32..50.0,
                step in -2.0f32..2.0,
                churn in 0u8..4,
            ) {
                let mut det = detector();
                for (i, variance) in variances.iter().enumerate() {
                    let mut rec = record(i as u64 * 1_000, *variance);
                    rec.cn0_mean_dbhz = mean;
                    rec.cn0_step_dbhz = Some(step);
                    rec.constellation_churn = Some(churn);
                    let verdict = det.assess(&rec);
                    prop_assert!(!verdict.flagged);
                    prop_assert_eq!(verdict.confidence, ConfidenceScore::ZERO);
                }
            }
        }
    }
}
