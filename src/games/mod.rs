//! Game variants.
//!
//! Each variant owns a typed state record and implements
//! [`GameEngine`](crate::rules::GameEngine).

pub mod undercover;
pub mod werewolf;

pub use undercover::UndercoverGame;
pub use werewolf::WerewolfGame;
