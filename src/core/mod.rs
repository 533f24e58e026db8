//! Core engine types: players, RNG, clock, events, phases, errors, configuration.
//!
//! This module contains the building blocks shared by both game variants.

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod phase;
pub mod player;
pub mod rng;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    countdown_secs, PotionRules, RoleCounts, RoleOverrides, RoomConfig, UndercoverConfig,
    UndercoverTimers, WerewolfConfig, WerewolfTimers,
};
pub use error::{EngineError, EngineResult};
pub use event::{GameEvent, OutboundEvent, RosterUpdate, TIMEOUT_EVENT};
pub use phase::{
    Countdown, DefaultAction, Phase, PhaseClock, TimeoutRecord, Timer, TimerMetadata,
};
pub use player::{Participant, PlayerAssignment, PlayerId, Roster};
pub use rng::{GameRng, GameRngState};
