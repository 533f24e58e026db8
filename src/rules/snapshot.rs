//! Durable session state.
//!
//! `SessionSnapshot` is the complete typed state of a session. Hosts persist
//! it as a `bincode` blob (or JSON for inspection) and hand it back to
//! `EngineFactory::restore` to resume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::engine::Variant;
use crate::core::{Phase, PlayerId, Timer};
use crate::games::undercover::UndercoverState;
use crate::games::werewolf::WerewolfState;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot encoding failed: {0}")]
    Binary(#[from] bincode::Error),
    #[error("snapshot JSON failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Full variant state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSnapshot {
    Undercover(Box<UndercoverState>),
    Werewolf(Box<WerewolfState>),
}

impl SessionSnapshot {
    #[must_use]
    pub fn variant(&self) -> Variant {
        match self {
            Self::Undercover(_) => Variant::Undercover,
            Self::Werewolf(_) => Variant::Werewolf,
        }
    }

    /// Encode as a compact binary blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a blob produced by `to_bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        Ok(bincode::deserialize(bytes)?)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Fields the host stores on its session record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistableFields {
    /// `SessionSnapshot::to_bytes` output.
    pub state: Vec<u8>,
    pub phase: Phase,
    pub stage: Option<String>,
    pub current_actor: Option<PlayerId>,
    pub round: u32,
    pub deadline: Option<DateTime<Utc>>,
    pub timer: Option<Timer>,
    pub finished: bool,
}

impl PersistableFields {
    /// Decode the stored state blob.
    pub fn snapshot(&self) -> Result<SessionSnapshot, SnapshotError> {
        SessionSnapshot::from_bytes(&self.state)
    }
}
