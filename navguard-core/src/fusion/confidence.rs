//! Fixed-Point Confidence Scores
//!
//! Confidence values live on [0, 1] but are stored as `u16` fixed-point
//! (65535 = 1.0). Comparisons, persistence decisions, and threshold
//! checks in the fused path are integer operations: exact, total-ordered,
//! and identical across targets with or without an FPU. Floats appear
//! only at the edges, where detector statistics are converted in and
//! telemetry reads values out.

/// Confidence in [0, 1] as 16-bit fixed point
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfidenceScore(u16);

impl ConfidenceScore {
    /// No confidence
    pub const ZERO: Self = Self(0);

    /// Full confidence
    pub const FULL: Self = Self(u16::MAX);

    /// Converts from a float, clamping to [0, 1] and rounding to nearest
    pub fn from_float(value: f32) -> Self {
        let clamped = value.clamp(0.0, 1.0);
        Self((clamped * u16::MAX as f32 + 0.5) as u16)
    }

    /// Severity of a bound violation
    ///
    /// 0.5 when the observed value sits exactly at the bound, saturating
    /// to 1.0 at twice the bound. Zero when the bound is not positive.
    pub fn from_ratio(observed: f32, bound: f32) -> Self {
        if bound <= 0.0 {
            return Self::ZERO;
        }
        Self::from_float(observed / (2.0 * bound))
    }

    /// Reconstructs a confidence from its raw fixed-point value
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Raw fixed-point value
    pub const fn raw(&self) -> u16 {
        self.0
    }

    /// Float view for telemetry and display
    pub fn as_float(&self) -> f32 {
        self.0 as f32 / u16::MAX as f32
    }

    /// True when this score reaches the threshold
    pub const fn meets(&self, threshold: Self) -> bool {
        self.0 >= threshold.0
    }

    /// Larger of two scores
    pub const fn max(self, other: Self) -> Self {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }
}
