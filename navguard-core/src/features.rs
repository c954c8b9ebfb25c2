//! Feature Extraction
//!
//! ## Overview
//!
//! Turns a raw [`Observation`] (plus, when available, the immediately
//! preceding one) into the flat [`FeatureRecord`] both detectors consume.
//! The record is `Copy`, owned by the pipeline run that requested it, and
//! discarded after the detectors have read it; the SNR sliding window keeps
//! only the small signal-statistics slice.
//!
//! ## Signal Statistics
//!
//! Cross-satellite C/N0 mean and variance are the spoofing-sensitive
//! statistics: a legitimate constellation shows several dB of
//! satellite-to-satellite spread, while a single-emitter spoofer collapses
//! it. The power-vs-elevation residual compares each satellite's C/N0
//! against a line-of-sight expectation that rises with elevation
//! (`expected = floor + span * sin(elevation)`); a large negative residual
//! on many satellites at once is the other single-emitter signature.
//! Statistics cover only satellites at or above the usability floor, so a
//! weak fringe tracker cannot dilute them.
//!
//! ## Kinematics
//!
//! Derived ground speed is displacement over time delta; acceleration is
//! the change in reported ground speed over time delta. Both need exactly
//! one predecessor epoch, keeping the extractor a pure function of at most
//! two observations. On the first epoch every delta field is `None`.
//!
//! ## Degradation, Not Failure
//!
//! Too few usable satellites is not an error: the record still carries
//! kinematics and the usable count, and the SNR detector degrades to an
//! insufficient-data verdict. The only hard failure is a non-monotonic
//! timestamp pair, which the pipeline treats as an ingestion reject.

use crate::config::DetectionConfig;
use crate::errors::{PipelineError, PipelineResult, RejectReason};
use crate::observation::Observation;
use crate::time::Timestamp;

/// Per-epoch feature summary consumed by both detectors
///
/// All fields derive from the current observation and (for the delta
/// fields) its immediate predecessor. `None` means the predecessor was
/// missing or unusable for that field.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeatureRecord {
    /// Epoch timestamp in milliseconds
    pub timestamp: Timestamp,
    /// Milliseconds since the previous accepted epoch
    pub time_delta_ms: Option<u32>,
    /// True when the time delta exceeds the configured maximum gap
    pub gap: bool,
    /// Satellites tracked this epoch
    pub total_sats: u8,
    /// Satellites at or above the C/N0 usability floor
    pub usable_sats: u8,
    /// Mean C/N0 across usable satellites (dB-Hz); 0 when none are usable
    pub cn0_mean_dbhz: f32,
    /// Population variance of C/N0 across usable satellites (dB-Hz²)
    pub cn0_variance_dbhz2: f32,
    /// Usable satellites whose power-vs-elevation residual is below the
    /// negative bound
    pub residual_flagged: u8,
    /// `residual_flagged` as a fraction of usable satellites
    pub residual_fraction: f32,
    /// Change in mean C/N0 since the previous epoch (dB-Hz, signed);
    /// `None` when either epoch had no usable satellites
    pub cn0_step_dbhz: Option<f32>,
    /// Tracked PRNs appeared plus PRNs lost versus the previous epoch
    pub constellation_churn: Option<u8>,
    /// Ground speed reported by the receiver fix (m/s)
    pub reported_speed_mps: f32,
    /// Ground speed derived from displacement over the time delta (m/s)
    pub derived_speed_mps: Option<f32>,
    /// Change in reported ground speed over the time delta (m/s², signed)
    pub accel_mps2: Option<f32>,
    /// Ground displacement from the previous fix (m)
    pub displacement_m: Option<f32>,
}

/// Mean and population variance of a slice of samples
///
/// Returns `(0.0, 0.0)` for an empty slice. Two-pass for numerical
/// stability; satellite tables are at most 16 entries so the extra pass
/// is free.
pub(crate) fn mean_variance(samples: &[f32]) -> (f32, f32) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }

    let n = samples.len() as f32;
    let mean = samples.iter().sum::<f32>() / n;
    let variance = samples.iter().map(|&x| (x - mean) * (x - mean)).sum::<f32>() / n;
    (mean, variance)
}

/// Stateless extractor: configuration scalars only, no epoch history
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    usable_floor_dbhz: f32,
    model_floor_dbhz: f32,
    model_span_dbhz: f32,
    residual_bound_dbhz: f32,
    max_gap_ms: u32,
}

impl FeatureExtractor {
    /// Creates an extractor from the detection configuration
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            usable_floor_dbhz: config.snr.usable_floor_dbhz,
            model_floor_dbhz: config.snr.model_floor_dbhz,
            model_span_dbhz: config.snr.model_span_dbhz,
            residual_bound_dbhz: config.snr.residual_bound_dbhz,
            max_gap_ms: config.kinematic.max_gap_ms,
        }
    }

    /// Expected line-of-sight C/N0 at the given elevation
    fn expected_cn0(&self, elevation_deg: f32) -> f32 {
        self.model_floor_dbhz + self.model_span_dbhz * libm::sinf(elevation_deg.to_radians())
    }

    /// Builds the feature record for `current`
    ///
    /// `previous` is the immediately preceding accepted observation, absent
    /// on the very first epoch. Fails only when `current` does not advance
    /// the clock past `previous`; every other shortfall degrades to `None`
    /// fields or a zero usable count.
    pub fn extract(
        &self,
        current: &Observation,
        previous: Option<&Observation>,
    ) -> PipelineResult<FeatureRecord> {
        if let Some(prev) = previous {
            if current.timestamp <= prev.timestamp {
                return Err(PipelineError::InvalidObservation {
                    reason: RejectReason::NonMonotonicTimestamp,
                });
            }
        }

        let total_sats = current.satellites.len() as u8;
        let usable_sats = current.usable_count(self.usable_floor_dbhz);

        // Signal statistics over usable satellites only
        let mut cn0 = [0.0f32; crate::constants::MAX_SATELLITES];
        let mut residual_flagged = 0u8;
        let mut count = 0usize;
        for signal in current.usable_signals(self.usable_floor_dbhz) {
            cn0[count] = signal.cn0_dbhz;
            count += 1;
            if signal.cn0_dbhz - self.expected_cn0(signal.elevation_deg) < -self.residual_bound_dbhz
            {
                residual_flagged += 1;
            }
        }
        let (cn0_mean_dbhz, cn0_variance_dbhz2) = mean_variance(&cn0[..count]);
        let residual_fraction = if count == 0 {
            0.0
        } else {
            residual_flagged as f32 / count as f32
        };

        let mut record = FeatureRecord {
            timestamp: current.timestamp,
            time_delta_ms: None,
            gap: false,
            total_sats,
            usable_sats,
            cn0_mean_dbhz,
            cn0_variance_dbhz2,
            residual_flagged,
            residual_fraction,
            cn0_step_dbhz: None,
            constellation_churn: None,
            reported_speed_mps: current.velocity.speed_mps,
            derived_speed_mps: None,
            accel_mps2: None,
            displacement_m: None,
        };

        let prev = match previous {
            Some(prev) => prev,
            None => return Ok(record),
        };

        let delta_ms = u32::try_from(current.timestamp - prev.timestamp).unwrap_or(u32::MAX);
        let delta_s = delta_ms as f32 / 1000.0;
        record.time_delta_ms = Some(delta_ms);
        record.gap = delta_ms > self.max_gap_ms;

        let displacement = current.position.ground_distance_m(&prev.position);
        record.displacement_m = Some(displacement);
        record.derived_speed_mps = Some(displacement / delta_s);
        record.accel_mps2 =
            Some((current.velocity.speed_mps - prev.velocity.speed_mps) / delta_s);

        let prev_usable = prev.usable_count(self.usable_floor_dbhz);
        if count > 0 && prev_usable > 0 {
            let mut prev_cn0 = [0.0f32; crate::constants::MAX_SATELLITES];
            let mut prev_count = 0usize;
            for signal in prev.usable_signals(self.usable_floor_dbhz) {
                prev_cn0[prev_count] = signal.cn0_dbhz;
                prev_count += 1;
            }
            let (prev_mean, _) = mean_variance(&prev_cn0[..prev_count]);
            record.cn0_step_dbhz = Some(cn0_mean_dbhz - prev_mean);
        }

        record.constellation_churn = Some(constellation_churn(current, prev));

        Ok(record)
    }
}

/// Tracked PRNs appeared plus PRNs lost between two epochs
fn constellation_churn(current: &Observation, previous: &Observation) -> u8 {
    let appeared = current
        .satellites
        .iter()
        .filter(|c| !previous.satellites.iter().any(|p| p.sat == c.sat))
        .count();
    let lost = previous
        .satellites
        .iter()
        .filter(|p| !current.satellites.iter().any(|c| c.sat == p.sat))
        .count();
    (appeared + lost) as u8
}
