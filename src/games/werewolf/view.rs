//! Night/day projection.
//!
//! A role is visible when its owner is dead, when the viewer owns it, or
//! once the game is over. Night intel goes only to the role that earned it.

use serde::{Deserialize, Serialize};

use super::state::{LastResult, SeerCheck, Stage, WerewolfRole, WerewolfState};
use crate::core::PlayerId;
use crate::rules::{PlayerView, PublicView, Variant, VariantDetail};

/// A fellow werewolf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllyView {
    pub id: PlayerId,
    pub display_name: String,
    pub alive: bool,
    pub is_ai: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WolfIntel {
    pub allies: Vec<AllyView>,
    pub selected_target: Option<PlayerId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeerIntel {
    pub history: Vec<SeerCheck>,
    pub last_check: Option<SeerCheck>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitchIntel {
    pub antidote_available: bool,
    pub poison_available: bool,
    /// Tonight's wolf target, while the night is unresolved.
    pub pending_kill: Option<PlayerId>,
}

/// What only the viewer knows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateView {
    pub role: WerewolfRole,
    pub wolves: Option<WolfIntel>,
    pub seer: Option<SeerIntel>,
    pub witch: Option<WitchIntel>,
}

/// Night/day specific view fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WerewolfDetail {
    pub last_result: LastResult,
    /// `None` for spectators.
    pub private: Option<PrivateView>,
}

pub(super) fn project(state: &WerewolfState, viewer: Option<PlayerId>) -> PublicView {
    let finished = state.stage == Stage::End || state.winner.is_some();
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
            role: (p.revealed || finished || viewer == Some(p.id)).then(|| p.role.as_str().to_string()),
            word: None,
        })
        .collect();

    let private = viewer
        .and_then(|v| state.roster.get(v).ok())
        .map(|me| private_view(state, me.id, me.role));

    PublicView {
        variant: Variant::Werewolf,
        phase: state.clock.phase(),
        stage: Some(state.stage.as_str().to_string()),
        round: state.round,
        current_player: match state.stage {
            Stage::DayDiscussion => state.speech.current(),
            _ => None,
        },
        players,
        speeches: state.speech.speeches().to_vec(),
        vote_summary: state.votes.summary(alive.len(), viewer),
        vote_round: state.votes.vote_round(),
        eligible_targets: if state.stage == Stage::DayVote {
            state.votes.eligible_targets(&alive)
        } else {
            Vec::new()
        },
        winner: state.winner.map(|w| w.as_str().to_string()),
        timer: state.clock.timer().cloned(),
        detail: VariantDetail::Werewolf(WerewolfDetail {
            last_result: state.last_result.clone(),
            private,
        }),
    }
}

fn private_view(state: &WerewolfState, me: PlayerId, role: WerewolfRole) -> PrivateView {
    let wolves = role.is_wolf().then(|| WolfIntel {
        allies: state
            .roster
            .iter()
            .filter(|p| p.role.is_wolf() && p.id != me)
            .map(|p| AllyView {
                id: p.id,
                display_name: p.display_name.clone(),
                alive: p.alive,
                is_ai: p.is_ai,
            })
            .collect(),
        selected_target: state.night.wolves_target,
    });

    let seer = (role == WerewolfRole::Seer).then(|| SeerIntel {
        history: state.seer_history.clone(),
        last_check: state.seer_history.last().cloned(),
    });

    let witch = (role == WerewolfRole::Witch).then(|| WitchIntel {
        antidote_available: state.potions.antidote,
        poison_available: state.potions.poison,
        pending_kill: state.night.wolves_target,
    });

    PrivateView {
        role,
        wolves,
        seer,
        witch,
    }
}
