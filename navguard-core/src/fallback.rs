//! Autonomous Mode State Machine
//!
//! ## Overview
//!
//! Three modes govern how much the platform trusts GNSS:
//!
//! - `Normal` — GNSS trusted; the last trusted fix is refreshed on every
//!   clean epoch.
//! - `Suspect` — a watch-level alert arrived; GNSS still drives
//!   navigation but the trusted fix is frozen and a clean run is awaited.
//! - `SafeFallback` — spoofing confirmed (or emergency-level in one
//!   epoch); GNSS no longer drives navigation, a fallback route is
//!   requested from the snapshot fix, and only an explicit external
//!   recovery signal exits.
//!
//! ## Transition Table
//!
//! | From | Event | To | Cause |
//! |------|-------|----|-------|
//! | Normal | confidence ≥ emergency | SafeFallback | `EmergencyAlert` |
//! | Normal | actionable alert | SafeFallback | `ActionableAlert` |
//! | Normal | flagged ∧ confidence ≥ watch | Suspect | `WatchAlert` |
//! | Suspect | confidence ≥ emergency | SafeFallback | `EmergencyAlert` |
//! | Suspect | actionable alert | SafeFallback | `ActionableAlert` |
//! | Suspect | configured run of clean epochs | Normal | `CleanRun` |
//! | SafeFallback | external recovery signal | Normal | `ExternalRecovery` |
//!
//! Everything else holds state. An actionable alert enters
//! `SafeFallback` from `Normal` as well as from `Suspect`: `actionable`
//! is only set once the persistence run is certified, the same evidence
//! a `Suspect` dwell exists to gather. The asymmetry is deliberate:
//! alerts can only push the machine toward safety, and nothing computed
//! from GNSS data can pull it back out of `SafeFallback` — a spoofer
//! owning the GNSS feed could otherwise manufacture its own all-clear.
//! Recovery is an out-of-band operator or alternate-positioning
//! decision.
//!
//! ## Trusted Fix Discipline
//!
//! `last_trusted` is written only when the epoch ends in `Normal` and no
//! detector flagged it. The fix handed to route recalculation therefore
//! always predates the anomaly onset, not merely the moment the alert
//! became actionable.

use heapless::Vec;

use crate::config::DetectionConfig;
use crate::constants::MAX_VERDICTS;
use crate::detectors::DetectorVerdict;
use crate::fusion::{ConfidenceScore, SpoofingAlert};
use crate::observation::Position;
use crate::time::Timestamp;

/// GNSS trust mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FallbackState {
    /// GNSS trusted, fix updates live
    Normal = 0,
    /// Watch-level anomaly, fix frozen, awaiting a clean run
    Suspect = 1,
    /// GNSS untrusted, navigating on the fallback route
    SafeFallback = 2,
}

impl FallbackState {
    /// Stable label for logs and telemetry
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Suspect => "suspect",
            Self::SafeFallback => "safe_fallback",
        }
    }
}

/// Position snapshot taken while GNSS was still trustworthy
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrustedFix {
    /// Fix position
    pub position: Position,
    /// Course over ground at the fix (degrees from true north)
    pub course_deg: f32,
    /// Epoch the fix was recorded
    pub timestamp: Timestamp,
}

/// What drove a state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransitionCause {
    /// Flagged alert at watch confidence
    WatchAlert,
    /// Actionable alert (confidence and persistence satisfied)
    ActionableAlert,
    /// Single-epoch emergency-level confidence
    EmergencyAlert,
    /// Configured run of clean epochs
    CleanRun,
    /// Out-of-band recovery signal
    ExternalRecovery,
}

impl TransitionCause {
    /// Stable label for logs and telemetry
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WatchAlert => "watch_alert",
            Self::ActionableAlert => "actionable_alert",
            Self::EmergencyAlert => "emergency_alert",
            Self::CleanRun => "clean_run",
            Self::ExternalRecovery => "external_recovery",
        }
    }
}

/// One edge taken in the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    /// State before
    pub from: FallbackState,
    /// State after
    pub to: FallbackState,
    /// Epoch (or wall time, for recovery) the edge was taken
    pub at: Timestamp,
    /// Why
    pub cause: TransitionCause,
}

/// Out-of-band signals allowed to clear `SafeFallback`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecoverySignal {
    /// A human confirmed the environment is clean
    OperatorConfirmed,
    /// An independent positioning source re-acquired and agrees
    AlternatePositioning,
}

/// The mode state machine
pub struct FallbackMachine {
    state: FallbackState,
    last_trusted: Option<TrustedFix>,
    entered_at: Timestamp,
    clean_run: u8,
    /// Verdicts that justified the current `SafeFallback`, kept for
    /// telemetry and route retries
    entry_verdicts: Vec<DetectorVerdict, MAX_VERDICTS>,
    watch: ConfidenceScore,
    emergency: ConfidenceScore,
    clean_epochs_to_normal: u8,
}

impl FallbackMachine {
    /// Creates a machine in `Normal` with no trusted fix yet
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            state: FallbackState::Normal,
            last_trusted: None,
            entered_at: 0,
            clean_run: 0,
            entry_verdicts: Vec::new(),
            watch: ConfidenceScore::from_float(config.fusion.watch_confidence),
            emergency: ConfidenceScore::from_float(config.fusion.emergency_confidence),
            clean_epochs_to_normal: config.fallback.clean_epochs_to_normal,
        }
    }

    /// Current state
    pub fn state(&self) -> FallbackState {
        self.state
    }

    /// Last fix recorded while GNSS was clean and trusted
    pub fn last_trusted(&self) -> Option<TrustedFix> {
        self.last_trusted
    }

    /// Epoch the current state was entered
    pub fn entered_at(&self) -> Timestamp {
        self.entered_at
    }

    /// Verdicts snapshot taken on `SafeFallback` entry
    pub fn entry_verdicts(&self) -> &[DetectorVerdict] {
        &self.entry_verdicts
    }

    /// Advances the machine by one epoch
    ///
    /// `fix_candidate` is the epoch's fix; it becomes the trusted fix
    /// only if the epoch ends in `Normal` with no flagged verdicts.
    /// Returns the transition taken, if any.
    pub fn advance(
        &mut self,
        alert: &SpoofingAlert,
        fix_candidate: TrustedFix,
    ) -> Option<Transition> {
        let emergency = alert.flagged && alert.confidence.meets(self.emergency);

        let transition = match self.state {
            FallbackState::Normal => {
                if emergency {
                    Some(self.enter_safe_fallback(alert, TransitionCause::EmergencyAlert))
                } else if alert.actionable {
                    Some(self.enter_safe_fallback(alert, TransitionCause::ActionableAlert))
                } else if alert.flagged && alert.confidence.meets(self.watch) {
                    Some(self.enter(FallbackState::Suspect, alert.timestamp, TransitionCause::WatchAlert))
                } else {
                    None
                }
            }
            FallbackState::Suspect => {
                if emergency {
                    Some(self.enter_safe_fallback(alert, TransitionCause::EmergencyAlert))
                } else if alert.actionable {
                    Some(self.enter_safe_fallback(alert, TransitionCause::ActionableAlert))
                } else if alert.clean() {
                    self.clean_run = self.clean_run.saturating_add(1);
                    if self.clean_run >= self.clean_epochs_to_normal {
                        Some(self.enter(
                            FallbackState::Normal,
                            alert.timestamp,
                            TransitionCause::CleanRun,
                        ))
                    } else {
                        None
                    }
                } else {
                    // Any flagged detector verdict restarts the clean run
                    self.clean_run = 0;
                    None
                }
            }
            // Absorbing: no alert or clean epoch exits, only recover()
            FallbackState::SafeFallback => None,
        };

        if self.state == FallbackState::Normal && alert.clean() {
            self.last_trusted = Some(fix_candidate);
        }

        transition
    }

    /// Takes the only `SafeFallback` → `Normal` edge
    ///
    /// Ignored in any other state. Resumes fix updates and restarts the
    /// clean-run counter.
    pub fn recover(&mut self, _signal: RecoverySignal, now: Timestamp) -> Option<Transition> {
        if self.state != FallbackState::SafeFallback {
            return None;
        }
        self.entry_verdicts.clear();
        Some(self.enter(FallbackState::Normal, now, TransitionCause::ExternalRecovery))
    }

    /// Restores the just-constructed state for deterministic replay
    pub fn reset(&mut self) {
        self.state = FallbackState::Normal;
        self.last_trusted = None;
        self.entered_at = 0;
        self.clean_run = 0;
        self.entry_verdicts.clear();
    }

    fn enter(
        &mut self,
        to: FallbackState,
        at: Timestamp,
        cause: TransitionCause,
    ) -> Transition {
        let from = self.state;
        self.state = to;
        self.entered_at = at;
        self.clean_run = 0;
        Transition { from, to, at, cause }
    }

    fn enter_safe_fallback(&mut self, alert: &SpoofingAlert, cause: TransitionCause) -> Transition {
        debug_assert!(
            !alert.verdicts.is_empty(),
            "safe fallback entry must carry its contributing verdicts"
        );
        self.entry_verdicts.clear();
        for verdict in &alert.verdicts {
            let _ = self.entry_verdicts.push(*verdict);
        }
        self.enter(FallbackState::SafeFallback, alert.timestamp, cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionConfig;
    use crate::detectors::{DetectorId, VerdictReason};

    fn machine() -> FallbackMachine {
        FallbackMachine::new(&DetectionConfig::default())
    }

    fn fix(timestamp: Timestamp) -> TrustedFix {
        TrustedFix {
            position: Position::new(47.0, -122.0, 50.0),
            course_deg: 90.0,
            timestamp,
        }
    }

    fn clean_alert(timestamp: Timestamp) -> SpoofingAlert {
        SpoofingAlert {
            timestamp,
            confidence: ConfidenceScore::ZERO,
            flagged: false,
            actionable: false,
            verdicts: Vec::new(),
            consecutive_flagged: 0,
        }
    }

    /// Flagged alert with one contributing SNR verdict
    fn flagged_alert(
        timestamp: Timestamp,
        confidence: f32,
        actionable: bool,
        consecutive: u8,
    ) -> SpoofingAlert {
        let confidence = ConfidenceScore::from_float(confidence);
        let mut verdicts = Vec::new();
        let _ = verdicts.push(DetectorVerdict::raise(
            DetectorId::Snr,
            VerdictReason::LowVariance,
            confidence,
        ));
        SpoofingAlert {
            timestamp,
            confidence,
            flagged: true,
            actionable,
            verdicts,
            consecutive_flagged: consecutive,
        }
    }

    /// Detector flagged but agreement failed: alert muted, epoch not clean
    fn muted_alert(timestamp: Timestamp, consecutive: u8) -> SpoofingAlert {
        let mut verdicts = Vec::new();
        let _ = verdicts.push(DetectorVerdict::raise(
            DetectorId::Snr,
            VerdictReason::LowVariance,
            ConfidenceScore::from_float(0.2),
        ));
        SpoofingAlert {
            timestamp,
            confidence: ConfidenceScore::ZERO,
            flagged: false,
            actionable: false,
            verdicts,
            consecutive_flagged: consecutive,
        }
    }

    #[test]
    fn starts_normal_without_a_fix() {
        let machine = machine();
        assert_eq!(machine.state(), FallbackState::Normal);
        assert!(machine.last_trusted().is_none());
    }

    #[test]
    fn clean_epochs_refresh_the_trusted_fix() {
        let mut machine = machine();
        assert!(machine.advance(&clean_alert(1_000), fix(1_000)).is_none());
        assert!(machine.advance(&clean_alert(2_000), fix(2_000)).is_none());

        let trusted = machine.last_trusted().unwrap();
        assert_eq!(trusted.timestamp, 2_000);
    }

    #[test]
    fn muted_epochs_freeze_the_fix_even_in_normal() {
        let mut machine = machine();
        machine.advance(&clean_alert(1_000), fix(1_000));
        // Detector flagged without agreement: state holds, fix frozen
        assert!(machine.advance(&muted_alert(2_000, 1), fix(2_000)).is_none());

        assert_eq!(machine.state(), FallbackState::Normal);
        assert_eq!(machine.last_trusted().unwrap().timestamp, 1_000);
    }

    #[test]
    fn watch_alert_moves_to_suspect() {
        let mut machine = machine();
        machine.advance(&clean_alert(1_000), fix(1_000));

        let transition = machine
            .advance(&flagged_alert(2_000, 0.45, false, 1), fix(2_000))
            .unwrap();
        assert_eq!(transition.from, FallbackState::Normal);
        assert_eq!(transition.to, FallbackState::Suspect);
        assert_eq!(transition.cause, TransitionCause::WatchAlert);
        // The suspect epoch's fix is not trusted
        assert_eq!(machine.last_trusted().unwrap().timestamp, 1_000);
    }

    #[test]
    fn suspect_returns_to_normal_after_clean_run() {
        let mut machine = machine();
        machine.advance(&flagged_alert(1_000, 0.45, false, 1), fix(1_000));
        assert_eq!(machine.state(), FallbackState::Suspect);

        // Default requirement is 5 clean epochs
        for ts in 2..=5u64 {
            assert!(machine.advance(&clean_alert(ts * 1_000), fix(ts * 1_000)).is_none());
            assert_eq!(machine.state(), FallbackState::Suspect);
        }
        let transition = machine.advance(&clean_alert(6_000), fix(6_000)).unwrap();
        assert_eq!(transition.to, FallbackState::Normal);
        assert_eq!(transition.cause, TransitionCause::CleanRun);
        // Fix updates resume on the same epoch
        assert_eq!(machine.last_trusted().unwrap().timestamp, 6_000);
    }

    #[test]
    fn flagged_epoch_restarts_the_clean_run() {
        let mut machine = machine();
        machine.advance(&flagged_alert(1_000, 0.45, false, 1), fix(1_000));
        for ts in 2..=4u64 {
            machine.advance(&clean_alert(ts * 1_000), fix(ts * 1_000));
        }
        // A muted flagged verdict is enough to restart the count
        machine.advance(&muted_alert(5_000, 1), fix(5_000));
        for ts in 6..=9u64 {
            machine.advance(&clean_alert(ts * 1_000), fix(ts * 1_000));
            assert_eq!(machine.state(), FallbackState::Suspect, "epoch {ts}");
        }
        machine.advance(&clean_alert(10_000), fix(10_000));
        assert_eq!(machine.state(), FallbackState::Normal);
    }

    #[test]
    fn actionable_alert_enters_safe_fallback_from_suspect() {
        let mut machine = machine();
        machine.advance(&flagged_alert(1_000, 0.45, false, 1), fix(1_000));

        let transition = machine
            .advance(&flagged_alert(2_000, 0.7, true, 4), fix(2_000))
            .unwrap();
        assert_eq!(transition.to, FallbackState::SafeFallback);
        assert_eq!(transition.cause, TransitionCause::ActionableAlert);
        assert_eq!(machine.entry_verdicts().len(), 1);
    }

    #[test]
    fn actionable_alert_enters_safe_fallback_from_normal() {
        let mut machine = machine();
        machine.advance(&clean_alert(1_000), fix(1_000));

        // Sub-emergency (0.7 < 0.9) but persistence-certified: no
        // Suspect dwell, the evidence is already sustained
        let transition = machine
            .advance(&flagged_alert(2_000, 0.7, true, 4), fix(2_000))
            .unwrap();
        assert_eq!(transition.from, FallbackState::Normal);
        assert_eq!(transition.to, FallbackState::SafeFallback);
        assert_eq!(transition.cause, TransitionCause::ActionableAlert);
        assert_eq!(machine.entry_verdicts().len(), 1);
    }

    #[test]
    fn emergency_bypasses_suspect() {
        let mut machine = machine();
        machine.advance(&clean_alert(1_000), fix(1_000));

        let transition = machine
            .advance(&flagged_alert(2_000, 0.95, false, 1), fix(2_000))
            .unwrap();
        assert_eq!(transition.from, FallbackState::Normal);
        assert_eq!(transition.to, FallbackState::SafeFallback);
        assert_eq!(transition.cause, TransitionCause::EmergencyAlert);
    }

    #[test]
    fn safe_fallback_absorbs_clean_epochs_and_alerts() {
        let mut machine = machine();
        machine.advance(&flagged_alert(1_000, 0.95, false, 1), fix(1_000));
        assert_eq!(machine.state(), FallbackState::SafeFallback);

        for ts in 2..=100u64 {
            assert!(machine.advance(&clean_alert(ts * 1_000), fix(ts * 1_000)).is_none());
            assert_eq!(machine.state(), FallbackState::SafeFallback);
        }
        // The trusted fix still predates the entry
        assert!(machine.last_trusted().is_none());
    }

    #[test]
    fn recovery_is_the_only_exit() {
        let mut machine = machine();
        machine.advance(&clean_alert(1_000), fix(1_000));
        machine.advance(&flagged_alert(2_000, 0.95, false, 1), fix(2_000));

        let transition = machine
            .recover(RecoverySignal::OperatorConfirmed, 50_000)
            .unwrap();
        assert_eq!(transition.from, FallbackState::SafeFallback);
        assert_eq!(transition.to, FallbackState::Normal);
        assert_eq!(transition.cause, TransitionCause::ExternalRecovery);
        assert!(machine.entry_verdicts().is_empty());

        // Fix updates resume
        machine.advance(&clean_alert(60_000), fix(60_000));
        assert_eq!(machine.last_trusted().unwrap().timestamp, 60_000);
    }

    #[test]
    fn recovery_is_ignored_outside_safe_fallback() {
        let mut machine = machine();
        assert!(machine.recover(RecoverySignal::OperatorConfirmed, 1_000).is_none());

        machine.advance(&flagged_alert(1_000, 0.45, false, 1), fix(1_000));
        assert!(machine.recover(RecoverySignal::AlternatePositioning, 2_000).is_none());
        assert_eq!(machine.state(), FallbackState::Suspect);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut machine = machine();
        machine.advance(&clean_alert(1_000), fix(1_000));
        machine.advance(&flagged_alert(2_000, 0.95, false, 1), fix(2_000));

        machine.reset();
        assert_eq!(machine.state(), FallbackState::Normal);
        assert!(machine.last_trusted().is_none());
        assert!(machine.entry_verdicts().is_empty());
    }
}
