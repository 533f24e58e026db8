//! # deduction-engine
//!
//! A game engine for social-deduction party games with human and
//! artificial players.
//!
//! ## Variants
//!
//! - **Undercover**: most players share a word, a few hold a related word
//!   or none. Players describe their word in turn, then vote someone out.
//! - **Werewolf**: hidden wolves kill by night; the seer checks roles and the
//!   witch holds one antidote and one poison. By day everyone votes.
//!
//! ## Design Principles
//!
//! 1. **Host-Driven**: The engine does no I/O and never sleeps. The host
//!    feeds events, persists [`PersistableFields`], and delivers `timeout`
//!    events once a deadline passes.
//!
//! 2. **Atomic Events**: An event either applies completely, including the
//!    artificial players' follow-up actions, or leaves no trace.
//!
//! 3. **Deterministic Replay**: All randomness comes from a seeded
//!    [`GameRng`] whose position is saved with the session.
//!
//! ## Modules
//!
//! - `core`: players, RNG, clock, events, phases and timers, errors, configuration
//! - `ports`: collaborator traits (content filter, word pool, text generation)
//! - `cycle`: shared speech queue and vote box
//! - `rules`: `GameEngine` trait, factory, snapshots, public views
//! - `games`: the two variants
//! - `ai`: speech and target decisions for artificial players
//! - `session`: sessions and the per-room directory

pub mod ai;
pub mod core;
pub mod cycle;
pub mod games;
pub mod ports;
pub mod rules;
pub mod session;

// Re-export commonly used types
pub use crate::core::{
    Clock, EngineError, EngineResult, GameEvent, GameRng, GameRngState, ManualClock,
    OutboundEvent, Participant, Phase, PlayerId, RoomConfig, RosterUpdate, SystemClock, Timer,
    UndercoverConfig, WerewolfConfig,
};

pub use crate::ports::{
    BannedWordFilter, ContentFilter, FilterMode, GenerationError, GenerationRequest,
    PassthroughFilter, PolicyViolation, StaticWordPool, TextGenerator, WordPair, WordPool,
};

pub use crate::rules::{
    Collaborators, EngineFactory, GameEngine, GameResult, PersistableFields, ProcessInput,
    ProcessOutcome, PublicView, SessionSnapshot, SnapshotError, Variant,
};

pub use crate::games::{UndercoverGame, WerewolfGame};

pub use crate::ai::{AiStyle, UndercoverStrategy, WerewolfStrategy};

pub use crate::session::{RoomId, Session, SessionDirectory, SessionId, SessionStatus};
