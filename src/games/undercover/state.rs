//! Word-guess session state and pure rules.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{
    GameRng, PhaseClock, PlayerId, Roster, TimeoutRecord, UndercoverConfig,
};
use crate::cycle::{SpeechQueue, VoteBox};
use crate::ports::WordPair;

/// Smallest playable table.
pub const MIN_PLAYERS: usize = 3;

/// Hidden role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndercoverRole {
    Civilian,
    Undercover,
    /// No word at all. Plays on the civilian side.
    Blank,
}

impl UndercoverRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Civilian => "civilian",
            Self::Undercover => "undercover",
            Self::Blank => "blank",
        }
    }
}

/// Winning faction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndercoverWinner {
    Civilian,
    Undercover,
}

impl UndercoverWinner {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Civilian => "civilian",
            Self::Undercover => "undercover",
        }
    }

    /// Whether a role plays for this faction.
    #[must_use]
    pub fn includes(self, role: UndercoverRole) -> bool {
        match self {
            Self::Civilian => role != UndercoverRole::Undercover,
            Self::Undercover => role == UndercoverRole::Undercover,
        }
    }
}

/// Public record of an artificial player's ballot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReveal {
    pub voter: PlayerId,
    pub target: PlayerId,
    pub voter_name: String,
    pub target_name: String,
    pub vote_round: u32,
    pub at: DateTime<Utc>,
}

/// Complete word-guess session state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UndercoverState {
    pub config: UndercoverConfig,
    pub clock: PhaseClock,
    pub round: u32,
    /// Speaking order.
    pub roster: Roster<UndercoverRole>,
    pub speech: SpeechQueue,
    pub votes: VoteBox,
    pub ai_vote_reveals: Vec<VoteReveal>,
    pub word_pair: WordPair,
    pub winner: Option<UndercoverWinner>,
    pub timeouts: Vec<TimeoutRecord>,
    /// Times the engine acted for each player after a countdown expired.
    pub default_actions: BTreeMap<PlayerId, u32>,
    pub rng: GameRng,
}

/// Build a shuffled role pool for `players` seats.
pub fn deal_roles(players: usize, undercover: usize, blank: usize, rng: &mut GameRng) -> Vec<UndercoverRole> {
    let civilians = players.saturating_sub(undercover + blank);
    let mut pool = Vec::with_capacity(players);
    pool.extend(std::iter::repeat(UndercoverRole::Undercover).take(undercover));
    pool.extend(std::iter::repeat(UndercoverRole::Blank).take(blank));
    pool.extend(std::iter::repeat(UndercoverRole::Civilian).take(civilians));
    rng.shuffle(&mut pool);
    pool
}

/// Win check over alive players.
///
/// Civilians win once no undercover is alive; undercover win once they are
/// at least as many as everyone else alive.
#[must_use]
pub fn check_winner(roster: &Roster<UndercoverRole>) -> Option<UndercoverWinner> {
    let undercover = roster.count_alive(|r| r == UndercoverRole::Undercover);
    let others = roster.count_alive(|r| r != UndercoverRole::Undercover);
    if undercover == 0 {
        Some(UndercoverWinner::Civilian)
    } else if undercover >= others {
        Some(UndercoverWinner::Undercover)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Participant, PlayerAssignment};
    use proptest::prelude::*;

    fn roster(roles: &[(UndercoverRole, bool)]) -> Roster<UndercoverRole> {
        let players = roles
            .iter()
            .enumerate()
            .map(|(i, &(role, alive))| {
                let mut p = PlayerAssignment::new(&Participant::human(i as u64 + 1, "p"), role, "");
                p.alive = alive;
                p
            })
            .collect();
        Roster::new(players).unwrap()
    }

    #[test]
    fn test_civilians_win_when_undercover_gone() {
        use UndercoverRole::*;
        let r = roster(&[(Civilian, true), (Civilian, true), (Undercover, false), (Blank, true)]);
        assert_eq!(check_winner(&r), Some(UndercoverWinner::Civilian));
    }

    #[test]
    fn test_undercover_win_on_parity() {
        use UndercoverRole::*;
        let r = roster(&[(Civilian, true), (Civilian, false), (Undercover, true)]);
        assert_eq!(check_winner(&r), Some(UndercoverWinner::Undercover));

        let ongoing = roster(&[(Civilian, true), (Civilian, true), (Undercover, true)]);
        assert_eq!(check_winner(&ongoing), None);
    }

    #[test]
    fn test_winner_includes_blank_with_civilians() {
        assert!(UndercoverWinner::Civilian.includes(UndercoverRole::Blank));
        assert!(!UndercoverWinner::Undercover.includes(UndercoverRole::Blank));
    }

    proptest! {
        /// Dealt roles always match the requested counts.
        #[test]
        fn prop_deal_roles_counts(
            players in 3usize..16,
            undercover in 1usize..4,
            blank in 0usize..3,
            seed in any::<u64>(),
        ) {
            prop_assume!(undercover + blank < players);
            let mut rng = GameRng::new(seed);
            let roles = deal_roles(players, undercover, blank, &mut rng);

            prop_assert_eq!(roles.len(), players);
            prop_assert_eq!(roles.iter().filter(|r| **r == UndercoverRole::Undercover).count(), undercover);
            prop_assert_eq!(roles.iter().filter(|r| **r == UndercoverRole::Blank).count(), blank);
            prop_assert!(roles.iter().any(|r| *r == UndercoverRole::Civilian));
        }

        /// The win check depends only on alive counts per faction.
        #[test]
        fn prop_win_check_is_count_based(
            civilians in 0usize..6,
            undercover in 0usize..4,
            blanks in 0usize..3,
        ) {
            prop_assume!(civilians + undercover + blanks > 0);
            let mut roles = Vec::new();
            roles.extend(std::iter::repeat((UndercoverRole::Civilian, true)).take(civilians));
            roles.extend(std::iter::repeat((UndercoverRole::Undercover, true)).take(undercover));
            roles.extend(std::iter::repeat((UndercoverRole::Blank, true)).take(blanks));
            let r = roster(&roles);

            let expected = if undercover == 0 {
                Some(UndercoverWinner::Civilian)
            } else if undercover >= civilians + blanks {
                Some(UndercoverWinner::Undercover)
            } else {
                None
            };
            prop_assert_eq!(check_winner(&r), expected);
        }
    }
}
