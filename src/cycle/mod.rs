//! Speech and voting cycle shared by both variants.
//!
//! - `SpeechQueue`: ordered speaking turns and the round's speech log
//! - `VoteBox`: ballots, tallies, revotes and tally history

pub mod speech;
pub mod vote;

pub use speech::{emit_speech_stream, sanitize_speech, Speech, SpeechQueue, TIMEOUT_SPEECH};
pub use vote::{TallyRecord, VoteBox, VoteOutcome, VoteSummary};

use crate::ports::FilterMode;

/// Who produced a speech or vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Human,
    Artificial,
    /// Default action taken by the engine when a countdown expires.
    Timeout,
}

impl Origin {
    #[must_use]
    pub fn filter_mode(self) -> FilterMode {
        match self {
            Self::Human => FilterMode::Reject,
            Self::Artificial | Self::Timeout => FilterMode::Mask,
        }
    }

    #[must_use]
    pub fn is_artificial(self) -> bool {
        matches!(self, Self::Artificial)
    }
}
