//! Phase tracking and countdown timers.
//!
//! `PhaseClock` is the shared core every variant embeds. It owns:
//! - the current `Phase`
//! - at most one armed `Timer` with its deadline and default action
//! - a generation counter bumped whenever a timer is armed or cleared
//! - the outbound notification and roster update buffers
//!
//! ## Stale timeouts
//!
//! Hosts deliver `timeout` events asynchronously, so a timeout may arrive
//! after the phase it was scheduled for has already moved on. A timeout is
//! applied only when a timer is armed, its deadline has passed, and any
//! `generation`/`stage` echoed in the payload matches the armed timer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::error::{EngineError, EngineResult};
use super::event::{GameEvent, OutboundEvent, RosterUpdate};
use super::player::PlayerId;

/// Coarse game phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Preparing,
    Speaking,
    Voting,
    Result,
    Night,
    Day,
    Ended,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::Speaking => "speaking",
            Self::Voting => "voting",
            Self::Result => "result",
            Self::Night => "night",
            Self::Day => "day",
            Self::Ended => "ended",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the engine does on its own when a timer expires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultAction {
    AutoStart,
    AutoSpeech { player: PlayerId },
    AutoVote,
    AutoWolfAttack,
    AutoSeerCheck,
    AutoWitchSkip,
}

/// Extra context attached to a timer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerMetadata {
    pub stage: Option<String>,
    pub current: Option<PlayerId>,
    pub pending: Vec<PlayerId>,
    /// Armed as a consequence of another timeout.
    pub auto: bool,
}

/// Request to arm a timer when entering a phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Countdown {
    pub duration_secs: u32,
    pub default_action: DefaultAction,
    pub description: Option<String>,
    pub metadata: TimerMetadata,
}

impl Countdown {
    pub fn new(duration_secs: u32, default_action: DefaultAction) -> Self {
        Self {
            duration_secs,
            default_action,
            description: None,
            metadata: TimerMetadata::default(),
        }
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: TimerMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// An armed countdown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub phase: Phase,
    pub duration_secs: u32,
    pub deadline: DateTime<Utc>,
    pub default_action: DefaultAction,
    pub description: Option<String>,
    pub metadata: TimerMetadata,
    pub generation: u64,
}

/// Record of an applied timeout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutRecord {
    pub phase: Phase,
    pub stage: Option<String>,
    pub round: u32,
    pub generation: u64,
    pub at: DateTime<Utc>,
}

/// Phase, timer and notification state shared by all variants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseClock {
    phase: Phase,
    timer: Option<Timer>,
    generation: u64,
    #[serde(skip)]
    outbox: Vec<OutboundEvent>,
    #[serde(skip)]
    roster_updates: Vec<RosterUpdate>,
}

impl PhaseClock {
    #[must_use]
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            timer: None,
            generation: 0,
            outbox: Vec::new(),
            roster_updates: Vec::new(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn timer(&self) -> Option<&Timer> {
        self.timer.as_ref()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.timer.as_ref().map(|t| t.deadline)
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Fail unless the session is in `expected`.
    pub fn ensure_phase(&self, expected: Phase) -> EngineResult<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(EngineError::invalid_phase(expected.as_str(), self.phase.as_str()))
        }
    }

    /// Switch phase and replace the timer.
    ///
    /// `None` or a zero-second countdown leaves the phase untimed.
    pub fn enter_phase(&mut self, phase: Phase, countdown: Option<Countdown>, now: DateTime<Utc>) {
        self.phase = phase;
        self.generation += 1;
        self.timer = countdown.filter(|c| c.duration_secs > 0).map(|c| Timer {
            phase,
            duration_secs: c.duration_secs,
            deadline: now + Duration::seconds(i64::from(c.duration_secs)),
            default_action: c.default_action,
            description: c.description,
            metadata: c.metadata,
            generation: self.generation,
        });
        if let Some(timer) = &self.timer {
            debug!(
                phase = %phase,
                generation = timer.generation,
                deadline = %timer.deadline,
                "timer armed"
            );
        }
    }

    /// Switch phase without touching the timer.
    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// Drop any armed timer.
    pub fn clear_timer(&mut self) {
        if self.timer.take().is_some() {
            self.generation += 1;
        }
    }

    /// Whether a `timeout` event should be applied now.
    #[must_use]
    pub fn timeout_applies(&self, event: &GameEvent, now: DateTime<Utc>) -> bool {
        let Some(timer) = &self.timer else {
            debug!(phase = %self.phase, "timeout ignored: no timer armed");
            return false;
        };
        if let Some(generation) = event.u64_field("generation") {
            if generation != timer.generation {
                debug!(expected = timer.generation, got = generation, "timeout ignored: stale generation");
                return false;
            }
        }
        if let (Some(stage), Some(armed)) = (event.str_field("stage"), timer.metadata.stage.as_deref()) {
            if stage != armed {
                debug!(expected = armed, got = stage, "timeout ignored: stage moved on");
                return false;
            }
        }
        if let Some(phase) = event.str_field("phase") {
            if phase != timer.phase.as_str() {
                debug!(expected = %timer.phase, got = phase, "timeout ignored: phase moved on");
                return false;
            }
        }
        if now < timer.deadline {
            debug!(deadline = %timer.deadline, now = %now, "timeout ignored: deadline not reached");
            return false;
        }
        true
    }

    /// Record an applied timeout against the armed timer.
    #[must_use]
    pub fn timeout_record(&self, round: u32, now: DateTime<Utc>) -> TimeoutRecord {
        TimeoutRecord {
            phase: self.phase,
            stage: self.timer.as_ref().and_then(|t| t.metadata.stage.clone()),
            round,
            generation: self.generation,
            at: now,
        }
    }

    /// Queue a notification for the host.
    pub fn emit_event(&mut self, kind: impl Into<String>, payload: Value) {
        self.outbox.push(OutboundEvent {
            kind: kind.into(),
            payload,
        });
    }

    /// Take queued notifications.
    pub fn drain_events(&mut self) -> Vec<OutboundEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Queue a roster change for the host.
    pub fn push_roster_update(&mut self, update: RosterUpdate) {
        self.roster_updates.push(update);
    }

    /// Take queued roster changes.
    pub fn drain_roster_updates(&mut self) -> Vec<RosterUpdate> {
        std::mem::take(&mut self.roster_updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::default()
    }

    #[test]
    fn test_enter_phase_arms_timer() {
        let mut clock = PhaseClock::new(Phase::Preparing);
        clock.enter_phase(
            Phase::Speaking,
            Some(Countdown::new(60, DefaultAction::AutoVote)),
            epoch(),
        );

        assert_eq!(clock.phase(), Phase::Speaking);
        let timer = clock.timer().unwrap();
        assert_eq!(timer.duration_secs, 60);
        assert_eq!(clock.deadline(), Some(epoch() + Duration::seconds(60)));
        assert_eq!(timer.generation, clock.generation());
    }

    #[test]
    fn test_zero_duration_disables_timer() {
        let mut clock = PhaseClock::new(Phase::Preparing);
        clock.enter_phase(Phase::Voting, Some(Countdown::new(0, DefaultAction::AutoVote)), epoch());
        assert!(clock.timer().is_none());
        assert_eq!(clock.phase(), Phase::Voting);
    }

    #[test]
    fn test_timeout_staleness() {
        let mut clock = PhaseClock::new(Phase::Preparing);
        let timeout = GameEvent::timeout();
        assert!(!clock.timeout_applies(&timeout, epoch()));

        let mut metadata = TimerMetadata::default();
        metadata.stage = Some("night.wolves".into());
        clock.enter_phase(
            Phase::Night,
            Some(Countdown::new(45, DefaultAction::AutoWolfAttack).with_metadata(metadata)),
            epoch(),
        );

        let later = epoch() + Duration::seconds(45);
        assert!(!clock.timeout_applies(&timeout, epoch()));
        assert!(clock.timeout_applies(&timeout, later));

        let stale = GameEvent::timeout().with("generation", clock.generation() + 5);
        assert!(!clock.timeout_applies(&stale, later));

        let wrong_stage = GameEvent::timeout().with("stage", "night.seer");
        assert!(!clock.timeout_applies(&wrong_stage, later));

        let matching = GameEvent::timeout()
            .with("generation", clock.generation())
            .with("stage", "night.wolves");
        assert!(clock.timeout_applies(&matching, later));
    }

    #[test]
    fn test_clear_timer_bumps_generation() {
        let mut clock = PhaseClock::new(Phase::Voting);
        clock.enter_phase(Phase::Voting, Some(Countdown::new(10, DefaultAction::AutoVote)), epoch());
        let armed = clock.generation();
        clock.clear_timer();
        assert!(clock.timer().is_none());
        assert_eq!(clock.generation(), armed + 1);
    }

    #[test]
    fn test_outbox_not_persisted() {
        let mut clock = PhaseClock::new(Phase::Speaking);
        clock.emit_event("undercover.speech_stream", json!({"chunk": "a"}));
        clock.push_roster_update(RosterUpdate::Eliminated { player: PlayerId(1) });

        let bytes = bincode::serialize(&clock).unwrap();
        let mut back: PhaseClock = bincode::deserialize(&bytes).unwrap();
        assert!(back.drain_events().is_empty());

        assert_eq!(clock.drain_events().len(), 1);
        assert_eq!(clock.drain_roster_updates().len(), 1);
        assert!(clock.drain_events().is_empty());
    }

    #[test]
    fn test_ensure_phase() {
        let clock = PhaseClock::new(Phase::Speaking);
        assert!(clock.ensure_phase(Phase::Speaking).is_ok());
        assert_eq!(
            clock.ensure_phase(Phase::Voting).unwrap_err(),
            EngineError::invalid_phase("voting", "speaking")
        );
    }
}
