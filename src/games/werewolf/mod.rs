//! Night/day hidden-role variant.
//!
//! Werewolves pick a victim each night; the seer checks one player and the
//! witch may save the victim or poison someone. By day everyone alive
//! speaks, then votes one player out.
//!
//! ## Flow
//!
//! ```text
//! night.wolves -> night.seer -> night.witch -> (resolve)
//!       ^                                          |
//!       |                                          v
//!       +------------- day.vote <- day.discussion -+-> end
//! ```
//!
//! Stages whose role holder is dead are skipped. The game ends as soon as
//! no wolf is alive or wolves are at least as many as everyone else.

mod game;
mod night;
pub mod state;
mod timeout;
mod view;

pub use game::WerewolfGame;
pub use state::{
    check_winner, deal_roles, LastResult, NightLedger, Potions, SeerCheck, Stage, WerewolfRole,
    WerewolfState, WerewolfWinner, MIN_PLAYERS,
};
pub use view::{AllyView, PrivateView, SeerIntel, WerewolfDetail, WitchIntel, WolfIntel};
