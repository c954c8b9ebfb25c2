//! Constants for NavGuard Core
//!
//! This module centralizes every numeric default used by the detection
//! pipeline. All values are defined here with their purpose, source, and
//! rationale; code elsewhere must reference these constants (or the
//! configuration derived from them) instead of magic numbers.
//!
//! Detection thresholds ultimately come from field calibration against
//! recorded clean and spoofed drives. Where a value is a calibration
//! default rather than a physical fact, the doc comment says so.

// ===== SIGNAL (C/N0) LIMITS =====

/// Lowest carrier-to-noise density a receiver meaningfully reports (dB-Hz).
///
/// Consumer GNSS receivers track signals down to roughly 20 dB-Hz; values
/// below ~10 dB-Hz indicate a parsing or hardware fault, not a signal.
///
/// Source: u-blox M8 receiver description, section on signal strength
pub const CN0_MIN_DBHZ: f32 = 0.0;

/// Highest plausible carrier-to-noise density (dB-Hz).
///
/// Open-sky tracking peaks near 50-52 dB-Hz; anything above 60 dB-Hz is
/// physically implausible for a satellite at ~20,000 km and suggests a
/// nearby terrestrial emitter or malformed input.
///
/// Source: GPS ICD link budget, typical receiver front-end gain
pub const CN0_MAX_DBHZ: f32 = 60.0;

/// Usability floor for per-satellite statistics (dB-Hz).
///
/// Satellites tracked below this level carry too much measurement noise to
/// contribute to variance or residual statistics and are masked out before
/// feature extraction.
///
/// Source: field calibration on recorded drives
pub const CN0_USABLE_FLOOR_DBHZ: f32 = 23.0;

/// Expected C/N0 at the horizon under line-of-sight conditions (dB-Hz).
///
/// Base of the elevation model: expected(elev) = floor + span * sin(elev).
/// Low-elevation satellites suffer atmospheric and multipath losses.
///
/// Source: field calibration; consistent with published elevation masks
pub const CN0_MODEL_FLOOR_DBHZ: f32 = 30.0;

/// C/N0 rise from horizon to zenith under line-of-sight conditions (dB-Hz).
///
/// Span of the elevation model. A satellite overhead is expected near
/// CN0_MODEL_FLOOR_DBHZ + CN0_MODEL_SPAN_DBHZ.
///
/// Source: field calibration
pub const CN0_MODEL_SPAN_DBHZ: f32 = 15.0;

// ===== SNR DETECTOR DEFAULTS =====

/// Minimum usable satellites required for signal statistics.
///
/// Variance over fewer samples is meaningless; below this count detectors
/// report insufficient data instead of a verdict.
///
/// Source: matches the four-satellite minimum of a 3D position fix
pub const MIN_USABLE_SATELLITES: u8 = 4;

/// Cross-satellite C/N0 variance floor for legitimate constellations (dB-Hz squared).
///
/// Independent satellites at different elevations and ranges show natural
/// spread; a single spoofing emitter collapses it. Sustained variance below
/// this threshold is the primary single-source signature.
///
/// Source: calibration default, to be tuned per receiver model
pub const SNR_VARIANCE_THRESHOLD: f32 = 4.0;

/// Consecutive low-variance epochs required before the SNR detector flags.
///
/// Single-epoch collapses happen under bridges and in urban canyons; the
/// signature must persist across the window before it counts.
///
/// Source: calibration default
pub const SNR_SUSTAIN_EPOCHS: u8 = 3;

/// Negative power-vs-elevation residual that marks a satellite anomalous (dB-Hz).
///
/// Observed C/N0 this far below the elevation model on a given satellite
/// indicates power inconsistent with line-of-sight geometry.
///
/// Source: calibration default
pub const RESIDUAL_BOUND_DBHZ: f32 = 10.0;

/// Fraction of usable satellites over the residual bound that flags the epoch.
///
/// One blocked satellite is multipath; half the constellation off-model at
/// once points at a common emitter.
///
/// Source: calibration default
pub const RESIDUAL_FRACTION_BOUND: f32 = 0.5;

/// Absolute jump in mean C/N0 between consecutive epochs that flags (dB-Hz).
///
/// Spoofer capture events step the whole constellation's power at once.
/// Legitimate signal evolution is gradual at epoch rate.
///
/// Source: field calibration on capture recordings
pub const CN0_STEP_BOUND_DBHZ: f32 = 6.0;

/// Relative jump in mean C/N0 (fraction of previous mean) that flags.
///
/// Complements the absolute bound at low signal levels, where a 6 dB-Hz
/// step would be a large relative change.
///
/// Source: field calibration on capture recordings
pub const CN0_STEP_BOUND_REL: f32 = 0.25;

/// Satellites appearing plus disappearing between epochs that flags churn.
///
/// A spoofer overpowering the sky replaces much of the visible set within
/// one or two epochs; natural constellation rotation changes one satellite
/// at a time.
///
/// Source: field calibration on capture recordings
pub const CONSTELLATION_CHURN_BOUND: u8 = 4;

// ===== KINEMATIC DETECTOR DEFAULTS =====

/// Maximum plausible ground speed for a small multirotor (m/s).
///
/// Consumer and light commercial multirotors top out near 20-25 m/s;
/// derived speeds beyond this bound cannot come from real motion.
///
/// Source: manufacturer specifications for the platform class
pub const MULTIROTOR_MAX_SPEED_MPS: f32 = 30.0;

/// Maximum plausible ground speed for a handheld/pedestrian platform (m/s).
///
/// Covers running and slow vehicle carry; a walking receiver reporting
/// highway speeds is being lied to.
///
/// Source: platform class bound
pub const PEDESTRIAN_MAX_SPEED_MPS: f32 = 12.0;

/// Maximum plausible acceleration for the default platform class (m/s squared).
///
/// Aggressive multirotor maneuvers stay under ~2 g sustained.
///
/// Source: platform class bound
pub const MAX_ACCELERATION_MPS2: f32 = 20.0;

/// Displacement between consecutive epochs treated as a position jump (m).
///
/// Checked together with derived speed - displacement alone is plausible
/// over a long gap, so the jump check never fires on displacement only.
///
/// Source: field calibration on replayed spoofing captures
pub const POSITION_JUMP_THRESHOLD_M: f32 = 30.0;

/// Epoch gap beyond which kinematic history is stale (ms).
///
/// After a gap this long the previous fix no longer constrains the current
/// one; the detector re-stabilizes instead of flagging.
///
/// Source: calibration default at 1 Hz epoch rate
pub const MAX_EPOCH_GAP_MS: u32 = 10_000;

/// In-bounds epochs required before kinematic verdicts arm.
///
/// Receivers wander during cold start and after gaps; verdicts are held
/// at confidence zero until motion has settled.
///
/// Source: field calibration (startup wander observations)
pub const STABILIZATION_EPOCHS: u8 = 4;

// ===== FUSION DEFAULTS =====

/// Relative weight of the SNR detector in fused confidence.
///
/// Signal-power statistics proved the stronger discriminator on recorded
/// attacks; kinematics corroborate.
///
/// Source: field calibration
pub const SNR_FUSION_WEIGHT: f32 = 0.6;

/// Relative weight of the kinematic detector in fused confidence.
pub const KINEMATIC_FUSION_WEIGHT: f32 = 0.4;

/// Single-detector confidence that satisfies the agreement rule alone.
///
/// One detector this certain does not need corroboration.
///
/// Source: calibration default
pub const HIGH_SINGLE_CONFIDENCE: f32 = 0.6;

/// Per-detector confidence at which two concurring detectors agree.
///
/// Two moderate, independent signatures beat one strong one for false
/// positive suppression.
///
/// Source: calibration default
pub const MODERATE_AGREE_CONFIDENCE: f32 = 0.3;

/// Fused confidence above which the platform enters watch (Suspect).
pub const WATCH_CONFIDENCE: f32 = 0.3;

/// Fused confidence required (with persistence) for an actionable alert.
pub const ACTIONABLE_CONFIDENCE: f32 = 0.6;

/// Single-epoch fused confidence that bypasses Suspect entirely.
///
/// Reserved for unambiguous signatures where reaction latency matters more
/// than confirmation.
pub const EMERGENCY_CONFIDENCE: f32 = 0.9;

/// Consecutive flagged epochs required before an alert is actionable.
///
/// Suppresses single-epoch flukes; see the persistence counter contract.
pub const PERSISTENCE_EPOCHS: u8 = 3;

/// Consecutive clean epochs required for Suspect to relax back to Normal.
pub const CLEAN_EPOCHS_TO_NORMAL: u8 = 5;

// ===== CAPACITIES =====

/// Maximum satellites carried per observation.
///
/// Receivers track more, but the strongest dozen carry the signal
/// statistics; capping bounds memory on embedded targets.
pub const MAX_SATELLITES: usize = 16;

/// Maximum detector verdicts per epoch (two detectors plus headroom).
pub const MAX_VERDICTS: usize = 4;

/// Sliding-window length for the SNR detector, in epochs.
///
/// At a 1 Hz epoch rate this spans a few seconds, long enough for the
/// sustain count with margin, short enough to track onset quickly.
pub const DEFAULT_WINDOW_EPOCHS: usize = 8;

/// Telemetry queue capacity. Must be a power of two.
pub const TELEMETRY_QUEUE_CAPACITY: usize = 64;

/// Maximum waypoints in a fallback route.
pub const MAX_ROUTE_WAYPOINTS: usize = 8;

// ===== GEODESY =====

/// Metres per degree of latitude.
///
/// Near-constant over the ellipsoid; longitude spacing scales with the
/// cosine of latitude.
///
/// Source: WGS-84 mean, adequate for sub-kilometre epoch displacements
pub const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Degrees-to-radians conversion factor.
pub const DEG_TO_RAD: f64 = core::f64::consts::PI / 180.0;

/// Radius of the holding pattern derived from the trusted fix (m).
///
/// Tight enough to stay inside the last trusted position's confidence
/// region, wide enough for a fixed-wing or multirotor loiter.
pub const LOITER_RADIUS_M: f64 = 50.0;
