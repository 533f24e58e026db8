//! Game engine trait for variant implementations.
//!
//! Variants implement `GameEngine` to define:
//! - How inbound events change state
//! - What artificial players do on their own
//! - What each viewer may see
//! - Win conditions
//!
//! The session layer drives engines only through this trait.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::snapshot::{PersistableFields, SessionSnapshot, SnapshotError};
use super::view::PublicView;
use crate::core::{
    EngineError, EngineResult, GameEvent, OutboundEvent, PhaseClock, PlayerId, RosterUpdate,
};

/// Supported game variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Word-guess: find the players holding the odd word.
    Undercover,
    /// Night/day elimination with hidden werewolves.
    Werewolf,
}

impl Variant {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Undercover => "undercover",
            Self::Werewolf => "werewolf",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "undercover" => Ok(Self::Undercover),
            "werewolf" => Ok(Self::Werewolf),
            other => Err(EngineError::Configuration(format!("unknown game variant: {other}"))),
        }
    }
}

/// Result of a completed game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    /// Winning faction label (e.g. "civilian", "werewolf").
    pub faction: String,
    /// Every player on the winning side, alive or not.
    pub winners: Vec<PlayerId>,
}

impl GameResult {
    /// Check if a player won.
    #[must_use]
    pub fn is_winner(&self, player: PlayerId) -> bool {
        self.winners.contains(&player)
    }
}

/// What one processed event produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcessOutcome {
    pub events: Vec<OutboundEvent>,
    pub roster_updates: Vec<RosterUpdate>,
    /// Artificial players acted after the event.
    pub auto_progress: bool,
    pub finished: bool,
}

/// One guarded processing step.
#[derive(Clone, Copy, Debug)]
pub enum ProcessInput<'a> {
    /// An inbound event, followed by artificial players.
    Event(&'a GameEvent),
    /// Artificial players only.
    AutoActions,
}

impl<'a> ProcessInput<'a> {
    /// Event type, or `auto_actions`.
    #[must_use]
    pub fn label(&self) -> &'a str {
        match *self {
            Self::Event(event) => event.kind.as_str(),
            Self::AutoActions => "auto_actions",
        }
    }
}

/// Game engine trait.
///
/// ## Implementation Notes
///
/// - `handle_event`: validate fully before mutating; errors map to `EngineError`
/// - `run_auto_actions`: loop until no artificial player can act; return
///   whether anything happened
/// - `snapshot`/`restore`: must capture the RNG position so replays match
pub trait GameEngine: Send {
    fn variant(&self) -> Variant;

    /// Shared phase and timer state.
    fn phase_clock(&self) -> &PhaseClock;

    /// Current round, starting at 1.
    fn round(&self) -> u32;

    /// Fine-grained stage label, for variants that have one.
    fn stage(&self) -> Option<&'static str>;

    /// Player expected to act next, if the phase has a single actor.
    fn current_actor(&self) -> Option<PlayerId>;

    /// Apply one inbound event.
    fn handle_event(&mut self, event: &GameEvent) -> EngineResult<()>;

    /// Let artificial players act until none can.
    fn run_auto_actions(&mut self) -> EngineResult<bool>;

    /// Project state for `viewer` (`None` = spectator).
    fn public_view(&self, viewer: Option<PlayerId>) -> PublicView;

    /// Returns `Some(result)` once a faction has won.
    fn result(&self) -> Option<GameResult>;

    /// True once the game reached its terminal phase.
    fn is_finished(&self) -> bool;

    fn snapshot(&self) -> SessionSnapshot;

    /// Replace state with a snapshot of the same variant.
    fn restore(&mut self, snapshot: SessionSnapshot) -> EngineResult<()>;

    fn drain_events(&mut self) -> Vec<OutboundEvent>;

    fn drain_roster_updates(&mut self) -> Vec<RosterUpdate>;

    // === Convenience Methods ===

    /// Handle an event, then run artificial players.
    fn process(&mut self, event: &GameEvent) -> EngineResult<ProcessOutcome> {
        self.process_with(ProcessInput::Event(event))
    }

    /// Apply `input` atomically and collect what it produced.
    ///
    /// On any error the pre-step snapshot is restored and queued output is
    /// discarded, so a rejected step leaves no trace.
    fn process_with(&mut self, input: ProcessInput<'_>) -> EngineResult<ProcessOutcome> {
        let checkpoint = self.snapshot();
        let result = match input {
            ProcessInput::Event(event) => self
                .handle_event(event)
                .and_then(|()| self.run_auto_actions()),
            ProcessInput::AutoActions => self.run_auto_actions(),
        };

        match result {
            Ok(auto_progress) => Ok(ProcessOutcome {
                events: self.drain_events(),
                roster_updates: self.drain_roster_updates(),
                auto_progress,
                finished: self.is_finished(),
            }),
            Err(err) => {
                self.drain_events();
                self.drain_roster_updates();
                self.restore(checkpoint)?;
                Err(err)
            }
        }
    }

    /// Fields the host stores alongside the session row.
    fn persistable(&self) -> Result<PersistableFields, SnapshotError> {
        let clock = self.phase_clock();
        Ok(PersistableFields {
            state: self.snapshot().to_bytes()?,
            phase: clock.phase(),
            stage: self.stage().map(str::to_string),
            current_actor: self.current_actor(),
            round: self.round(),
            deadline: clock.deadline(),
            timer: clock.timer().cloned(),
            finished: self.is_finished(),
        })
    }
}
