//! Inbound game events and outbound notifications.
//!
//! Inbound events are a type string plus a JSON payload, exactly as the
//! host receives them from clients. Each variant parses them into its own
//! typed command before touching state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::player::PlayerId;

/// Event type hosts send when a phase timer fires.
pub const TIMEOUT_EVENT: &str = "timeout";

/// Event submitted to a running session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
    #[serde(default)]
    pub actor: Option<PlayerId>,
}

impl GameEvent {
    /// New event with an empty payload and no actor.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Map::new(),
            actor: None,
        }
    }

    /// Timer expiry event.
    #[must_use]
    pub fn timeout() -> Self {
        Self::new(TIMEOUT_EVENT)
    }

    /// Set the acting player.
    #[must_use]
    pub fn with_actor(mut self, actor: PlayerId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Add a payload field.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    /// Read a player id field. Accepts numbers and numeric strings.
    #[must_use]
    pub fn player_field(&self, key: &str) -> Option<PlayerId> {
        match self.payload.get(key)? {
            Value::Number(n) => n.as_u64().map(PlayerId),
            Value::String(s) => s.trim().parse().ok().map(PlayerId),
            _ => None,
        }
    }

    /// Read a string field.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Read a boolean flag. Missing or non-boolean values are `false`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.payload.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Read an unsigned integer field.
    #[must_use]
    pub fn u64_field(&self, key: &str) -> Option<u64> {
        self.payload.get(key).and_then(Value::as_u64)
    }
}

/// Notification queued for the host to fan out (speech streams, vote reveals).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

/// Change to player-facing roster records the host should persist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RosterUpdate {
    /// Role (and word) assigned at game start.
    Assigned {
        player: PlayerId,
        role: String,
        word: Option<String>,
    },
    /// Player left the alive set.
    Eliminated { player: PlayerId },
    /// Player spent a night ability.
    SkillUsed { player: PlayerId, skill: String },
}
