//! Player identification and the per-session roster.
//!
//! ## PlayerId
//!
//! Stable participant identifier handed to the engine by the host
//! (room membership id). Not an index: ids are sparse and arbitrary.
//!
//! ## Roster
//!
//! Ordered list of `PlayerAssignment`s. The order is significant: the
//! word-guess variant stores players in speaking order, the night/day
//! variant in seat order. Alive/revealed flags change on elimination;
//! entries are never removed during a session.

use serde::{Deserialize, Deserializer, Serialize};

use super::error::{EngineError, EngineResult};
use crate::ai::AiStyle;

/// Stable player identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl PlayerId {
    /// Create a new player ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A room member joining a new game, in seat order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: PlayerId,
    pub display_name: String,
    #[serde(default)]
    pub is_ai: bool,
    /// Style key from room configuration. Unknown keys fall back to the default style.
    #[serde(default, deserialize_with = "lenient_style")]
    pub ai_style: Option<AiStyle>,
}

fn lenient_style<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<AiStyle>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(|key| AiStyle::resolve(&key)))
}

impl Participant {
    /// A human participant.
    pub fn human(id: u64, display_name: impl Into<String>) -> Self {
        Self {
            id: PlayerId(id),
            display_name: display_name.into(),
            is_ai: false,
            ai_style: None,
        }
    }

    /// An artificial participant with the given behavior style.
    pub fn ai(id: u64, display_name: impl Into<String>, style: AiStyle) -> Self {
        Self {
            id: PlayerId(id),
            display_name: display_name.into(),
            is_ai: true,
            ai_style: Some(style),
        }
    }
}

/// One participant's hidden assignment for the session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAssignment<R> {
    pub id: PlayerId,
    pub display_name: String,
    pub role: R,
    /// Secret word (word-guess variant). Empty for blanks and for variants without words.
    pub word: String,
    pub is_ai: bool,
    pub ai_style: Option<AiStyle>,
    pub alive: bool,
    pub revealed: bool,
}

impl<R> PlayerAssignment<R> {
    /// Build an assignment for a participant.
    pub fn new(participant: &Participant, role: R, word: impl Into<String>) -> Self {
        Self {
            id: participant.id,
            display_name: participant.display_name.clone(),
            role,
            word: word.into(),
            is_ai: participant.is_ai,
            ai_style: participant.ai_style,
            alive: true,
            revealed: false,
        }
    }
}

/// Ordered player roster for a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster<R> {
    players: Vec<PlayerAssignment<R>>,
}

impl<R: Copy + PartialEq> Roster<R> {
    /// Create a roster. Fails on duplicate ids.
    pub fn new(players: Vec<PlayerAssignment<R>>) -> EngineResult<Self> {
        for (i, player) in players.iter().enumerate() {
            if players[..i].iter().any(|p| p.id == player.id) {
                return Err(EngineError::Configuration(format!(
                    "player {} appears twice in the roster",
                    player.id
                )));
            }
        }
        Ok(Self { players })
    }

    /// Number of players (alive or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// True if the roster has no players.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Look up a player's assignment.
    pub fn get(&self, id: PlayerId) -> EngineResult<&PlayerAssignment<R>> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .ok_or(EngineError::UnknownPlayer(id))
    }

    /// Look up a player's assignment mutably.
    pub fn get_mut(&mut self, id: PlayerId) -> EngineResult<&mut PlayerAssignment<R>> {
        self.players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(EngineError::UnknownPlayer(id))
    }

    /// Check whether the id belongs to this roster.
    #[must_use]
    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    /// Iterate over assignments in roster order.
    pub fn iter(&self) -> impl Iterator<Item = &PlayerAssignment<R>> {
        self.players.iter()
    }

    /// All player ids in roster order.
    #[must_use]
    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id).collect()
    }

    /// Alive player ids in roster order.
    #[must_use]
    pub fn alive_ids(&self) -> Vec<PlayerId> {
        self.players.iter().filter(|p| p.alive).map(|p| p.id).collect()
    }

    /// Check if a player is alive. Unknown ids are not alive.
    #[must_use]
    pub fn is_alive(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == id && p.alive)
    }

    /// Check if a player is artificial. Unknown ids are not.
    #[must_use]
    pub fn is_ai(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == id && p.is_ai)
    }

    /// Get a player's role.
    pub fn role_of(&self, id: PlayerId) -> EngineResult<R> {
        self.get(id).map(|p| p.role)
    }

    /// Player ids holding `role`, alive or not.
    #[must_use]
    pub fn with_role(&self, role: R) -> Vec<PlayerId> {
        self.players.iter().filter(|p| p.role == role).map(|p| p.id).collect()
    }

    /// Alive player ids holding `role`.
    #[must_use]
    pub fn alive_with_role(&self, role: R) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|p| p.alive && p.role == role)
            .map(|p| p.id)
            .collect()
    }

    /// Count alive players matching a role predicate.
    pub fn count_alive(&self, pred: impl Fn(R) -> bool) -> usize {
        self.players.iter().filter(|p| p.alive && pred(p.role)).count()
    }

    /// Display name for a player, falling back to the id.
    #[must_use]
    pub fn display_name(&self, id: PlayerId) -> String {
        self.get(id)
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|_| id.to_string())
    }

    /// Mark a player as eliminated.
    ///
    /// Returns `false` if the player was already dead.
    pub fn eliminate(&mut self, id: PlayerId, reveal: bool) -> EngineResult<bool> {
        let player = self.get_mut(id)?;
        if !player.alive {
            return Ok(false);
        }
        player.alive = false;
        if reveal {
            player.revealed = true;
        }
        Ok(true)
    }

    /// Reveal every assignment (game over).
    pub fn reveal_all(&mut self) {
        for player in &mut self.players {
            player.revealed = true;
        }
    }
}
