//! Word-guess variant.
//!
//! Most players share one word; a few undercover players hold a related
//! word and blanks hold none. Players take turns describing their word,
//! then vote someone out.
//!
//! ## Flow
//!
//! ```text
//! preparing -> speaking -> voting -+-> speaking (next round)
//!                            ^     |
//!                            +-----+ revote on a partial tie
//!                                  +-> result
//! ```

mod game;
pub mod state;
mod timeout;
mod view;

pub use game::UndercoverGame;
pub use state::{
    check_winner, deal_roles, UndercoverRole, UndercoverState, UndercoverWinner, VoteReveal,
    MIN_PLAYERS,
};
pub use view::UndercoverDetail;
