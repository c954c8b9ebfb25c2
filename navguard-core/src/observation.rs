//! GNSS Observation Model
//!
//! ## Overview
//!
//! The per-epoch input to the detection pipeline: a receiver fix (position
//! and velocity) plus the per-satellite signal table (PRN, C/N0, elevation,
//! azimuth). One `Observation` is produced per GNSS epoch, typically at
//! 1-10 Hz.
//!
//! Observations are immutable once built. Producers normalize units before
//! construction (degrees for angles, dB-Hz for carrier-to-noise density,
//! metres and seconds for kinematics); the pipeline validates but never
//! converts.
//!
//! ## Validation Boundary
//!
//! `Observation::validate()` is the ingestion gate: non-finite fields,
//! out-of-range angles or signal levels, and empty constellations are
//! rejected with a [`RejectReason`] before any feature extraction happens.
//! Timestamp ordering is checked by the pipeline itself, since it requires
//! the previous accepted epoch.
//!
//! ## Geodesy
//!
//! Displacement between consecutive fixes uses the equirectangular
//! approximation (cos-latitude scaled planar distance). Epoch-to-epoch
//! baselines are tens of metres; at those scales the approximation is
//! sub-millimetre accurate and needs one `cos` and one `sqrt` instead of
//! a haversine chain.

use heapless::Vec;

use crate::constants::{
    CN0_MAX_DBHZ, CN0_MIN_DBHZ, DEG_TO_RAD, MAX_SATELLITES, METERS_PER_DEG_LAT,
};
use crate::errors::RejectReason;
use crate::time::Timestamp;

/// Satellite identifier (PRN for GPS, slot/PRN equivalents elsewhere)
pub type SatId = u16;

/// One satellite's signal measurement within an epoch
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SatelliteSignal {
    /// Satellite identifier
    pub sat: SatId,
    /// Carrier-to-noise density in dB-Hz
    pub cn0_dbhz: f32,
    /// Elevation above the horizon in degrees, [0, 90]
    pub elevation_deg: f32,
    /// Azimuth clockwise from true north in degrees, [0, 360)
    pub azimuth_deg: f32,
}

impl SatelliteSignal {
    /// Creates a signal entry
    pub const fn new(sat: SatId, cn0_dbhz: f32, elevation_deg: f32, azimuth_deg: f32) -> Self {
        Self {
            sat,
            cn0_dbhz,
            elevation_deg,
            azimuth_deg,
        }
    }
}

/// Geodetic position from the receiver fix
///
/// Latitude and longitude are `f64`: `f32` carries only metre-level
/// resolution at mid-latitudes, which would swamp the 30 m jump threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Position {
    /// Latitude in degrees, [-90, 90]
    pub lat_deg: f64,
    /// Longitude in degrees, [-180, 180]
    pub lon_deg: f64,
    /// Altitude above the WGS-84 ellipsoid in metres
    pub alt_m: f32,
}

impl Position {
    /// Creates a position
    pub const fn new(lat_deg: f64, lon_deg: f64, alt_m: f32) -> Self {
        Self {
            lat_deg,
            lon_deg,
            alt_m,
        }
    }

    /// Ground distance to another position in metres
    ///
    /// Equirectangular approximation: the longitude delta is scaled by the
    /// cosine of the mean latitude, then both deltas are converted to
    /// metres and combined as planar components. Valid for the short
    /// epoch-to-epoch baselines this pipeline measures; not a general
    /// great-circle routine.
    pub fn ground_distance_m(&self, other: &Position) -> f32 {
        let mid_lat_rad = (self.lat_deg + other.lat_deg) * 0.5 * DEG_TO_RAD;
        let north_m = (other.lat_deg - self.lat_deg) * METERS_PER_DEG_LAT;
        let east_m = (other.lon_deg - self.lon_deg) * METERS_PER_DEG_LAT * libm::cos(mid_lat_rad);
        libm::sqrt(north_m * north_m + east_m * east_m) as f32
    }
}

/// Velocity from the receiver fix
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Velocity {
    /// Ground speed in metres per second, non-negative
    pub speed_mps: f32,
    /// Course over ground clockwise from true north in degrees, [0, 360)
    pub course_deg: f32,
}

impl Velocity {
    /// Creates a velocity
    pub const fn new(speed_mps: f32, course_deg: f32) -> Self {
        Self {
            speed_mps,
            course_deg,
        }
    }
}

/// One GNSS epoch: fix plus per-satellite signal table
///
/// Capacity is fixed at [`MAX_SATELLITES`]; the builder keeps the
/// strongest signals when more are offered.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Observation {
    /// Epoch timestamp in milliseconds
    pub timestamp: Timestamp,
    /// Receiver position fix
    pub position: Position,
    /// Receiver velocity fix
    pub velocity: Velocity,
    /// Tracked satellites, at most [`MAX_SATELLITES`]
    pub satellites: Vec<SatelliteSignal, MAX_SATELLITES>,
}

impl Observation {
    /// Starts building an observation for the given epoch
    pub fn builder(timestamp: Timestamp) -> ObservationBuilder {
        ObservationBuilder::new(timestamp)
    }

    /// Checks structural validity, returning the first violation found
    ///
    /// Checks, in order: constellation non-empty, every float finite,
    /// angles within their documented ranges, C/N0 within
    /// [[`CN0_MIN_DBHZ`], [`CN0_MAX_DBHZ`]]. Ordering against the previous
    /// epoch is the pipeline's job.
    pub fn validate(&self) -> Result<(), RejectReason> {
        if self.satellites.is_empty() {
            return Err(RejectReason::EmptyConstellation);
        }

        if !self.position.lat_deg.is_finite()
            || !self.position.lon_deg.is_finite()
            || !self.position.alt_m.is_finite()
            || !self.velocity.speed_mps.is_finite()
            || !self.velocity.course_deg.is_finite()
        {
            return Err(RejectReason::NonFiniteField);
        }

        if !(-90.0..=90.0).contains(&self.position.lat_deg)
            || !(-180.0..=180.0).contains(&self.position.lon_deg)
            || !(0.0..360.0).contains(&self.velocity.course_deg)
            || self.velocity.speed_mps < 0.0
        {
            return Err(RejectReason::AngleOutOfRange);
        }

        for signal in &self.satellites {
            if !signal.cn0_dbhz.is_finite()
                || !signal.elevation_deg.is_finite()
                || !signal.azimuth_deg.is_finite()
            {
                return Err(RejectReason::NonFiniteField);
            }
            if !(0.0..=90.0).contains(&signal.elevation_deg)
                || !(0.0..360.0).contains(&signal.azimuth_deg)
            {
                return Err(RejectReason::AngleOutOfRange);
            }
            if !(CN0_MIN_DBHZ..=CN0_MAX_DBHZ).contains(&signal.cn0_dbhz) {
                return Err(RejectReason::SignalOutOfRange);
            }
        }

        Ok(())
    }

    /// Satellites at or above the C/N0 usability floor
    pub fn usable_signals(&self, floor_dbhz: f32) -> impl Iterator<Item = &SatelliteSignal> {
        self.satellites.iter().filter(move |s| s.cn0_dbhz >= floor_dbhz)
    }

    /// Count of satellites at or above the C/N0 usability floor
    pub fn usable_count(&self, floor_dbhz: f32) -> u8 {
        self.usable_signals(floor_dbhz).count() as u8
    }
}

/// Staged construction of an [`Observation`]: timestamp, then fix, then
/// satellites
///
/// ```rust
/// use navguard_core::observation::Observation;
///
/// let obs = Observation::builder(1_000)
///     .position(47.61, -122.33, 56.0)
///     .velocity(4.2, 180.0)
///     .satellite(7, 45.0, 62.0, 120.0)
///     .satellite(12, 41.5, 38.0, 240.0)
///     .build();
/// assert_eq!(obs.satellites.len(), 2);
/// ```
pub struct ObservationBuilder {
    timestamp: Timestamp,
    position: Position,
    velocity: Velocity,
    satellites: Vec<SatelliteSignal, MAX_SATELLITES>,
}

impl ObservationBuilder {
    /// Creates a builder with a zeroed fix
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            position: Position::new(0.0, 0.0, 0.0),
            velocity: Velocity::new(0.0, 0.0),
            satellites: Vec::new(),
        }
    }

    /// Sets the position fix
    pub fn position(mut self, lat_deg: f64, lon_deg: f64, alt_m: f32) -> Self {
        self.position = Position::new(lat_deg, lon_deg, alt_m);
        self
    }

    /// Sets the velocity fix
    pub fn velocity(mut self, speed_mps: f32, course_deg: f32) -> Self {
        self.velocity = Velocity::new(speed_mps, course_deg);
        self
    }

    /// Adds a satellite signal
    ///
    /// When the table is full the weakest tracked signal is evicted if the
    /// incoming one is stronger, so a crowded sky keeps its best
    /// [`MAX_SATELLITES`] signals rather than the first-seen ones.
    pub fn satellite(mut self, sat: SatId, cn0_dbhz: f32, elevation_deg: f32, azimuth_deg: f32) -> Self {
        let signal = SatelliteSignal::new(sat, cn0_dbhz, elevation_deg, azimuth_deg);
        if self.satellites.push(signal).is_err() {
            if let Some((weakest_idx, weakest)) = self
                .satellites
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.cn0_dbhz.total_cmp(&b.cn0_dbhz))
                .map(|(i, s)| (i, s.cn0_dbhz))
            {
                if cn0_dbhz > weakest {
                    self.satellites[weakest_idx] = signal;
                }
            }
        }
        self
    }

    /// Finalizes the observation
    pub fn build(self) -> Observation {
        Observation {
            timestamp: self.timestamp,
            position: self.position,
            velocity: self.velocity,
            satellites: self.satellites,
        }
    }
}
