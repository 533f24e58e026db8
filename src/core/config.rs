//! Room configuration types.
//!
//! Hosts pass a room's JSON configuration when starting a game:
//! - `UndercoverConfig`: faction sizes, word-pair filters, countdowns
//! - `WerewolfConfig`: role overrides, potion rules, countdowns
//! - `RoomConfig`: one of the above, parsed from either room JSON shape
//!
//! The resolved config is stored inside the session state, so a restored
//! session uses exactly the settings it started with.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{EngineError, EngineResult};
use crate::ai::AiStyle;
use crate::rules::Variant;

/// Convert a configured duration to countdown seconds. `<= 0` disables.
#[must_use]
pub fn countdown_secs(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Word-guess countdowns in seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndercoverTimers {
    pub preparing: i64,
    pub speaking: i64,
    pub voting: i64,
}

impl Default for UndercoverTimers {
    fn default() -> Self {
        Self {
            preparing: 30,
            speaking: 60,
            voting: 45,
        }
    }
}

/// Word-guess variant settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndercoverConfig {
    /// Undercover players. Clamped to at least one.
    pub undercover_count: u32,
    /// Players with no word.
    pub blank_count: u32,
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    /// Style for artificial players that did not bring their own.
    pub ai_style: AiStyle,
    /// Ask the text generator before falling back to heuristics.
    pub use_llm: bool,
    pub timers: UndercoverTimers,
}

impl Default for UndercoverConfig {
    fn default() -> Self {
        Self {
            undercover_count: 1,
            blank_count: 0,
            topic: None,
            difficulty: None,
            ai_style: AiStyle::Balanced,
            use_llm: false,
            timers: UndercoverTimers::default(),
        }
    }
}

impl UndercoverConfig {
    /// Set the number of undercover players.
    #[must_use]
    pub fn with_undercover(mut self, count: u32) -> Self {
        self.undercover_count = count;
        self
    }

    /// Set the number of blank players.
    #[must_use]
    pub fn with_blanks(mut self, count: u32) -> Self {
        self.blank_count = count;
        self
    }

    /// Restrict word pairs to a topic.
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Restrict word pairs to a difficulty.
    #[must_use]
    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = Some(difficulty.into());
        self
    }

    /// Enable text generation for AI players.
    #[must_use]
    pub fn with_llm(mut self, enabled: bool) -> Self {
        self.use_llm = enabled;
        self
    }

    /// Replace the countdowns.
    #[must_use]
    pub fn with_timers(mut self, timers: UndercoverTimers) -> Self {
        self.timers = timers;
        self
    }

    /// Disable every countdown.
    #[must_use]
    pub fn untimed(self) -> Self {
        self.with_timers(UndercoverTimers {
            preparing: 0,
            speaking: 0,
            voting: 0,
        })
    }

    /// Undercover count after clamping.
    #[must_use]
    pub fn effective_undercover(&self) -> usize {
        self.undercover_count.max(1) as usize
    }
}

/// Optional role-count overrides. Unset roles use player-count fallbacks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleOverrides {
    pub werewolf: Option<u32>,
    pub seer: Option<u32>,
    pub witch: Option<u32>,
}

/// Protector potion rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PotionRules {
    pub antidote: bool,
    pub poison: bool,
    /// Allow both potions in the same night.
    pub allow_double: bool,
}

impl Default for PotionRules {
    fn default() -> Self {
        Self {
            antidote: true,
            poison: true,
            allow_double: false,
        }
    }
}

/// Night/day countdowns in seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WerewolfTimers {
    pub night_wolves: i64,
    pub night_seer: i64,
    pub night_witch: i64,
    pub day_discussion: i64,
    pub day_vote: i64,
}

impl Default for WerewolfTimers {
    fn default() -> Self {
        Self {
            night_wolves: 45,
            night_seer: 30,
            night_witch: 30,
            day_discussion: 90,
            day_vote: 45,
        }
    }
}

/// Night/day variant settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WerewolfConfig {
    pub roles: RoleOverrides,
    pub witch: PotionRules,
    pub ai_style: AiStyle,
    pub use_llm: bool,
    pub timers: WerewolfTimers,
}

/// Resolved role distribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounts {
    pub werewolf: usize,
    pub seer: usize,
    pub witch: usize,
    pub villager: usize,
}

impl WerewolfConfig {
    /// Override role counts.
    #[must_use]
    pub fn with_roles(mut self, werewolf: u32, seer: u32, witch: u32) -> Self {
        self.roles = RoleOverrides {
            werewolf: Some(werewolf),
            seer: Some(seer),
            witch: Some(witch),
        };
        self
    }

    /// Replace the potion rules.
    #[must_use]
    pub fn with_potions(mut self, potions: PotionRules) -> Self {
        self.witch = potions;
        self
    }

    /// Enable text generation for AI players.
    #[must_use]
    pub fn with_llm(mut self, enabled: bool) -> Self {
        self.use_llm = enabled;
        self
    }

    /// Replace the countdowns.
    #[must_use]
    pub fn with_timers(mut self, timers: WerewolfTimers) -> Self {
        self.timers = timers;
        self
    }

    /// Disable every countdown.
    #[must_use]
    pub fn untimed(self) -> Self {
        self.with_timers(WerewolfTimers {
            night_wolves: 0,
            night_seer: 0,
            night_witch: 0,
            day_discussion: 0,
            day_vote: 0,
        })
    }

    /// Resolve role counts for `players` participants.
    pub fn role_counts(&self, players: usize) -> EngineResult<RoleCounts> {
        let max_wolves = players.saturating_sub(1).max(1);
        let werewolf = self
            .roles
            .werewolf
            .map_or((players / 4).max(1), |n| n as usize)
            .clamp(1, max_wolves);
        let seer = self
            .roles
            .seer
            .map_or(usize::from(players >= 5), |n| n as usize)
            .min(1);
        let witch = self
            .roles
            .witch
            .map_or(usize::from(players >= 6), |n| n as usize)
            .min(1);

        let special = werewolf + seer + witch;
        if special >= players {
            return Err(EngineError::Configuration(format!(
                "{players} players cannot hold {werewolf} werewolves, {seer} seer and {witch} witch with at least one villager"
            )));
        }

        Ok(RoleCounts {
            werewolf,
            seer,
            witch,
            villager: players - special,
        })
    }
}

/// Variant configuration for a new game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomConfig {
    Undercover(UndercoverConfig),
    Werewolf(WerewolfConfig),
}

impl RoomConfig {
    /// Default configuration for a variant.
    #[must_use]
    pub fn default_for(variant: Variant) -> Self {
        match variant {
            Variant::Undercover => Self::Undercover(UndercoverConfig::default()),
            Variant::Werewolf => Self::Werewolf(WerewolfConfig::default()),
        }
    }

    #[must_use]
    pub fn variant(&self) -> Variant {
        match self {
            Self::Undercover(_) => Variant::Undercover,
            Self::Werewolf(_) => Variant::Werewolf,
        }
    }

    /// Parse the variant section of a room's JSON config.
    ///
    /// Accepts `{"undercover": {...}}` and `{"game": {"undercover": {...}}}`.
    /// A missing section yields defaults.
    pub fn from_json(variant: Variant, room: &Value) -> EngineResult<Self> {
        let key = variant.as_str();
        let section = room
            .get(key)
            .or_else(|| room.get("game").and_then(|game| game.get(key)))
            .cloned()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        let invalid = |err: serde_json::Error| {
            EngineError::Configuration(format!("invalid {key} configuration: {err}"))
        };
        match variant {
            Variant::Undercover => serde_json::from_value(section)
                .map(Self::Undercover)
                .map_err(invalid),
            Variant::Werewolf => serde_json::from_value(section)
                .map(Self::Werewolf)
                .map_err(invalid),
        }
    }
}
