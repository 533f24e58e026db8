//! Speaking order and speech records.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::Origin;
use crate::core::{EngineError, EngineResult, PhaseClock, PlayerId};
use crate::ports::ContentFilter;

/// Text submitted for a speaker whose countdown expired.
pub const TIMEOUT_SPEECH: &str = "(system) player timed out";

/// Stand-in when artificial text is empty after sanitizing.
const EMPTY_SPEECH_PLACEHOLDER: &str = "(pass)";

/// A recorded speech.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speech {
    pub player: PlayerId,
    pub content: String,
    pub is_ai: bool,
    pub round: u32,
    pub at: DateTime<Utc>,
}

/// Remaining speakers for the current round plus the round's speeches.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechQueue {
    queue: VecDeque<PlayerId>,
    speeches: Vec<Speech>,
}

impl SpeechQueue {
    /// Start a speaking pass over `order`. Speeches are kept.
    pub fn reset(&mut self, order: Vec<PlayerId>) {
        self.queue = order.into();
    }

    /// Empty the queue without recording anything.
    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    /// Forget the round's speeches.
    pub fn clear_speeches(&mut self) {
        self.speeches.clear();
    }

    /// Player whose turn it is.
    #[must_use]
    pub fn current(&self) -> Option<PlayerId> {
        self.queue.front().copied()
    }

    /// Speakers still waiting, current included.
    #[must_use]
    pub fn remaining(&self) -> Vec<PlayerId> {
        self.queue.iter().copied().collect()
    }

    #[must_use]
    pub fn speeches(&self) -> &[Speech] {
        &self.speeches
    }

    /// Check that `actor` holds the current turn.
    pub fn ensure_turn(&self, actor: Option<PlayerId>) -> EngineResult<PlayerId> {
        let actor = actor.ok_or_else(|| EngineError::InvalidTurn("speech requires an acting player".into()))?;
        match self.current() {
            Some(current) if current == actor => Ok(actor),
            Some(current) => Err(EngineError::InvalidTurn(format!(
                "it is {current}'s turn to speak, not {actor}'s"
            ))),
            None => Err(EngineError::InvalidTurn("no speaker is pending".into())),
        }
    }

    /// Record the current speaker's speech and advance.
    ///
    /// Returns the next speaker, or `None` when everyone has spoken.
    pub fn record(&mut self, speech: Speech) -> Option<PlayerId> {
        if self.current() == Some(speech.player) {
            self.queue.pop_front();
        }
        self.speeches.push(speech);
        self.current()
    }
}

/// Sanitize raw speech for `origin`.
///
/// Human text is rejected on banned terms and may not be empty; artificial
/// text is masked and replaced by a placeholder when nothing survives.
pub fn sanitize_speech(filter: &dyn ContentFilter, raw: &str, origin: Origin) -> EngineResult<String> {
    let cleaned = filter.sanitize(raw.trim(), origin.filter_mode())?;
    let cleaned = cleaned.trim();
    if !cleaned.is_empty() {
        return Ok(cleaned.to_string());
    }
    match origin {
        Origin::Human => Err(EngineError::ContentPolicyViolation(
            "speech content cannot be empty".into(),
        )),
        Origin::Artificial | Origin::Timeout => Ok(EMPTY_SPEECH_PLACEHOLDER.to_string()),
    }
}

/// Queue one `<prefix>.speech_stream` event per character of an artificial speech.
pub fn emit_speech_stream(
    clock: &mut PhaseClock,
    prefix: &str,
    speaker: PlayerId,
    content: &str,
    at: DateTime<Utc>,
) {
    let kind = format!("{prefix}.speech_stream");
    let total = content.chars().count();
    let timestamp = at.to_rfc3339();
    let mut cumulative = String::with_capacity(content.len());
    for (index, ch) in content.chars().enumerate() {
        cumulative.push(ch);
        clock.emit_event(
            kind.clone(),
            json!({
                "playerId": speaker,
                "chunk": ch.to_string(),
                "content": cumulative,
                "index": index,
                "timestamp": timestamp,
                "isAi": true,
                "done": index + 1 == total,
            }),
        );
    }
}
