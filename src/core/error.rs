//! Engine error taxonomy.
//!
//! Every rejected event maps to exactly one `EngineError` kind. Rejection
//! leaves session state unchanged; the session layer restores its
//! checkpoint before surfacing the error.

use thiserror::Error;

use super::player::PlayerId;

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced to the host for a rejected event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Event not valid in the current phase or stage.
    #[error("invalid phase: expected {expected}, currently {current}")]
    InvalidPhase { expected: String, current: String },

    /// Event type not recognized by this variant.
    #[error("unknown event type: {0}")]
    UnknownEvent(String),

    /// Actor missing, not the current speaker, dead, or already acted.
    #[error("invalid turn: {0}")]
    InvalidTurn(String),

    /// Target missing, dead, ineligible, or a disallowed self-target.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// Impossible role/player counts or empty word pool at start.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A consumable ability was already spent.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Human-submitted text contained banned terms.
    #[error("content policy violation: {0}")]
    ContentPolicyViolation(String),

    /// Referenced player is not part of this session.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
}

impl EngineError {
    /// Shorthand for a phase/stage mismatch.
    pub fn invalid_phase(expected: impl Into<String>, current: impl Into<String>) -> Self {
        Self::InvalidPhase {
            expected: expected.into(),
            current: current.into(),
        }
    }

    /// Stable machine-readable kind for host error responses.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPhase { .. } => "invalid_phase",
            Self::UnknownEvent(_) => "unknown_event",
            Self::InvalidTurn(_) => "invalid_turn",
            Self::InvalidTarget(_) => "invalid_target",
            Self::Configuration(_) => "configuration",
            Self::ResourceExhausted(_) => "resource_exhausted",
            Self::ContentPolicyViolation(_) => "content_policy_violation",
            Self::UnknownPlayer(_) => "unknown_player",
        }
    }
}
