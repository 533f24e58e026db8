//! Night/day session state and pure rules.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{
    GameRng, Phase, PhaseClock, PlayerId, RoleCounts, Roster, TimeoutRecord, WerewolfConfig,
};
use crate::cycle::{SpeechQueue, VoteBox};

/// Smallest playable table.
pub const MIN_PLAYERS: usize = 4;

/// Hidden role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WerewolfRole {
    Werewolf,
    /// Checks one player's role each night.
    Seer,
    /// Holds one antidote and one poison.
    Witch,
    Villager,
}

impl WerewolfRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Werewolf => "werewolf",
            Self::Seer => "seer",
            Self::Witch => "witch",
            Self::Villager => "villager",
        }
    }

    #[must_use]
    pub fn is_wolf(self) -> bool {
        self == Self::Werewolf
    }
}

/// Winning faction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WerewolfWinner {
    Villager,
    Werewolf,
}

impl WerewolfWinner {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Villager => "villager",
            Self::Werewolf => "werewolf",
        }
    }

    #[must_use]
    pub fn includes(self, role: WerewolfRole) -> bool {
        match self {
            Self::Villager => !role.is_wolf(),
            Self::Werewolf => role.is_wolf(),
        }
    }
}

/// Fine-grained position within a night or day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    NightWolves,
    NightSeer,
    NightWitch,
    DayDiscussion,
    DayVote,
    End,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NightWolves => "night.wolves",
            Self::NightSeer => "night.seer",
            Self::NightWitch => "night.witch",
            Self::DayDiscussion => "day.discussion",
            Self::DayVote => "day.vote",
            Self::End => "end",
        }
    }

    /// Coarse phase this stage belongs to.
    #[must_use]
    pub fn phase(self) -> Phase {
        match self {
            Self::NightWolves | Self::NightSeer | Self::NightWitch => Phase::Night,
            Self::DayDiscussion | Self::DayVote => Phase::Day,
            Self::End => Phase::Ended,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remaining witch potions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Potions {
    pub antidote: bool,
    pub poison: bool,
    pub allow_double: bool,
}

/// One seer check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeerCheck {
    pub target: PlayerId,
    pub role: WerewolfRole,
    pub round: u32,
    pub at: DateTime<Utc>,
}

/// Actions taken during the current night. Reset every night.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightLedger {
    pub wolves_target: Option<PlayerId>,
    pub seer_result: Option<SeerCheck>,
    pub witch_saved: bool,
    pub witch_poison: Option<PlayerId>,
    pub witch_acted: bool,
}

/// Deaths of the most recent night and day.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastResult {
    pub night_killed: SmallVec<[PlayerId; 2]>,
    pub saved: Option<PlayerId>,
    pub lynched: Option<PlayerId>,
}

/// Complete night/day session state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WerewolfState {
    pub config: WerewolfConfig,
    pub clock: PhaseClock,
    pub stage: Stage,
    pub round: u32,
    /// Seat order.
    pub roster: Roster<WerewolfRole>,
    pub potions: Potions,
    pub night: NightLedger,
    pub speech: SpeechQueue,
    pub votes: VoteBox,
    pub last_result: LastResult,
    pub seer_history: Vec<SeerCheck>,
    pub winner: Option<WerewolfWinner>,
    pub timeouts: Vec<TimeoutRecord>,
    pub default_actions: BTreeMap<PlayerId, u32>,
    pub rng: GameRng,
}

impl WerewolfState {
    #[must_use]
    pub fn alive_wolves(&self) -> Vec<PlayerId> {
        self.roster.alive_with_role(WerewolfRole::Werewolf)
    }

    /// The seer, alive or not.
    #[must_use]
    pub fn seer(&self) -> Option<PlayerId> {
        self.roster.with_role(WerewolfRole::Seer).first().copied()
    }

    /// The witch, alive or not.
    #[must_use]
    pub fn witch(&self) -> Option<PlayerId> {
        self.roster.with_role(WerewolfRole::Witch).first().copied()
    }

    #[must_use]
    pub fn alive_seer(&self) -> Option<PlayerId> {
        self.seer().filter(|id| self.roster.is_alive(*id))
    }

    #[must_use]
    pub fn alive_witch(&self) -> Option<PlayerId> {
        self.witch().filter(|id| self.roster.is_alive(*id))
    }
}

/// Build a shuffled role pool.
pub fn deal_roles(counts: RoleCounts, rng: &mut GameRng) -> Vec<WerewolfRole> {
    let mut pool = Vec::with_capacity(counts.werewolf + counts.seer + counts.witch + counts.villager);
    pool.extend(std::iter::repeat(WerewolfRole::Werewolf).take(counts.werewolf));
    pool.extend(std::iter::repeat(WerewolfRole::Seer).take(counts.seer));
    pool.extend(std::iter::repeat(WerewolfRole::Witch).take(counts.witch));
    pool.extend(std::iter::repeat(WerewolfRole::Villager).take(counts.villager));
    rng.shuffle(&mut pool);
    pool
}

/// Win check over alive players.
#[must_use]
pub fn check_winner(roster: &Roster<WerewolfRole>) -> Option<WerewolfWinner> {
    let wolves = roster.count_alive(WerewolfRole::is_wolf);
    let others = roster.count_alive(|r| !r.is_wolf());
    if wolves == 0 {
        Some(WerewolfWinner::Villager)
    } else if wolves >= others {
        Some(WerewolfWinner::Werewolf)
    } else {
        None
    }
}
