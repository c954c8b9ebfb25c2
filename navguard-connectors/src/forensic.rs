//! Forensic Telemetry Sinks
//!
//! ## Overview
//!
//! During a spoofing incident the most valuable artefact is a complete
//! record of what the receiver reported and what the pipeline decided,
//! including every epoch processed while GNSS was untrusted. Two sinks
//! serve that need:
//!
//! - [`JsonlSink`] — one `serde_json` line per event into any
//!   `io::Write`. Line-oriented output survives truncation (a crash
//!   loses at most one partial line) and feeds standard tooling
//!   directly. Buffered; flushed on drop.
//! - [`LogSink`] — forwards events to the `log` facade by severity for
//!   live operation: transitions and actionable alerts at warn,
//!   rejections and degradations at debug.
//!
//! Both honor the sink contract: `record` never fails into the decision
//! loop. The JSONL sink counts write and serialization errors instead
//! of raising them; callers that care inspect [`JsonlSink::dropped`].

use std::io::{BufWriter, Write};

use navguard_core::telemetry::{TelemetryEvent, TelemetrySink};

use crate::ConnectorError;

/// Line-per-event JSON sink over any writer
pub struct JsonlSink<W: Write> {
    writer: BufWriter<W>,
    written: u64,
    dropped: u64,
}

impl<W: Write> JsonlSink<W> {
    /// Wraps the writer in a buffer
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            written: 0,
            dropped: 0,
        }
    }

    /// Events successfully written
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Events lost to write or serialization errors
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Flushes buffered lines to the underlying writer
    pub fn flush(&mut self) -> Result<(), ConnectorError> {
        self.writer.flush()?;
        Ok(())
    }

    fn write_event(&mut self, event: &TelemetryEvent) -> Result<(), ConnectorError> {
        let line = serde_json::to_string(event)?;
        writeln!(self.writer, "{line}")?;
        Ok(())
    }
}

impl<W: Write> TelemetrySink for JsonlSink<W> {
    fn record(&mut self, event: &TelemetryEvent) {
        // A failing disk must not reach the decision loop
        match self.write_event(event) {
            Ok(()) => self.written += 1,
            Err(_) => self.dropped += 1,
        }
    }
}

impl<W: Write> Drop for JsonlSink<W> {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Sink forwarding events to the `log` facade by severity
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn record(&mut self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::Alert(alert) if alert.actionable => log::warn!(
                "actionable spoofing alert at {}: confidence {:.2}, {} consecutive",
                alert.timestamp,
                alert.confidence.as_float(),
                alert.consecutive_flagged
            ),
            TelemetryEvent::Alert(alert) => log::info!(
                "spoofing alert at {}: confidence {:.2}",
                alert.timestamp,
                alert.confidence.as_float()
            ),
            TelemetryEvent::Transition(transition) => log::warn!(
                "state {} -> {} ({})",
                transition.from.as_str(),
                transition.to.as_str(),
                transition.cause.as_str()
            ),
            TelemetryEvent::ProviderFailure { timestamp, reason } => {
                log::warn!("route provider failure at {timestamp}: {reason}")
            }
            TelemetryEvent::RouteReady {
                timestamp,
                waypoints,
            } => log::info!("fallback route ready at {timestamp}: {waypoints} waypoints"),
            TelemetryEvent::Rejected { timestamp, reason } => {
                log::debug!("observation at {timestamp} rejected: {}", reason.as_str())
            }
            TelemetryEvent::Degraded {
                timestamp,
                detector,
                reason,
            } => log::debug!(
                "{} detector degraded at {timestamp}: {}",
                detector.as_str(),
                reason.as_str()
            ),
            TelemetryEvent::Epoch {
                timestamp,
                state,
                trusted,
            } => log::trace!(
                "epoch {timestamp}: state {} trusted {trusted}",
                state.as_str()
            ),
        }
    }
}
