//! Time representation
//!
//! The pipeline is driven purely by the timestamps its observations
//! carry; it never reads a clock, which is what makes replaying a
//! recorded sequence deterministic. The one operation that needs
//! out-of-band time, [`recover`](crate::pipeline::SpoofingPipeline::recover),
//! takes its timestamp from the caller.

/// Timestamp in milliseconds since epoch (or device boot)
pub type Timestamp = u64;
