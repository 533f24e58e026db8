//! Word-guess projection.
//!
//! Roles and words stay hidden until the result phase. Before that a player
//! sees only their own word, never their own role; spectators see neither.

use serde::{Deserialize, Serialize};

use super::state::{UndercoverState, VoteReveal};
use crate::core::{Phase, PlayerId};
use crate::ports::WordPair;
use crate::rules::{PlayerView, PublicView, VariantDetail, Variant};

/// Word-guess specific view fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndercoverDetail {
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    /// The viewer's own word. Empty for blanks.
    pub self_word: Option<String>,
    pub ai_vote_reveals: Vec<VoteReveal>,
    pub revote_candidates: Vec<PlayerId>,
    /// Both words, once the game is over.
    pub word_pair: Option<WordPair>,
}

pub(super) fn project(state: &UndercoverState, viewer: Option<PlayerId>) -> PublicView {
    let phase = state.clock.phase();
    let finished = phase == Phase::Result;
    let alive = state.roster.alive_ids();

    let players = state
        .roster
        .iter()
        .map(|p| PlayerView {
            id: p.id,
            display_name: p.display_name.clone(),
            is_ai: p.is_ai,
            ai_style: p.ai_style,
            alive: p.alive,
            role: finished.then(|| p.role.as_str().to_string()),
            word: (finished || viewer == Some(p.id)).then(|| p.word.clone()),
        })
        .collect();

    let self_word = viewer
        .and_then(|v| state.roster.get(v).ok())
        .map(|p| p.word.clone());

    PublicView {
        variant: Variant::Undercover,
        phase,
        stage: None,
        round: state.round,
        current_player: if phase == Phase::Speaking {
            state.speech.current()
        } else {
            None
        },
        players,
        speeches: state.speech.speeches().to_vec(),
        vote_summary: state.votes.summary(alive.len(), viewer),
        vote_round: state.votes.vote_round(),
        eligible_targets: if phase == Phase::Voting {
            state.votes.eligible_targets(&alive)
        } else {
            Vec::new()
        },
        winner: state.winner.map(|w| w.as_str().to_string()),
        timer: state.clock.timer().cloned(),
        detail: VariantDetail::Undercover(UndercoverDetail {
            topic: state.word_pair.topic.clone(),
            difficulty: state.word_pair.difficulty.clone(),
            self_word,
            ai_vote_reveals: state.ai_vote_reveals.clone(),
            revote_candidates: state.votes.revote_candidates().to_vec(),
            word_pair: finished.then(|| state.word_pair.clone()),
        }),
    }
}
