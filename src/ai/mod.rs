//! Decision making for artificial players.
//!
//! Each session builds one strategy per variant at start. A strategy uses
//! the optional [`TextGenerator`](crate::ports::TextGenerator) for speeches
//! and votes and falls back to style templates and heuristics whenever the
//! model is missing or fails. Targets proposed here are advisory: the engine
//! passes them through [`ensure_legal_target`] before applying them.

pub mod decision;
pub mod telemetry;
mod model;
mod prompt;
pub mod style;
pub mod undercover;
pub mod werewolf;

pub use decision::{
    ensure_legal_target, last_mentioned, parse_decision, Decision, DecisionSource, ParsedDecision,
};
pub use telemetry::{describe_metrics, DecisionKind};
pub use style::{generate_display_name, random_style, AiStyle};
pub use undercover::{UndercoverSeat, UndercoverStrategy};
pub use werewolf::{WerewolfSeat, WerewolfStrategy, WitchContext, WitchDecision};
