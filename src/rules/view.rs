//! Viewer-specific projections of session state.
//!
//! Hidden information (roles, words, night actions) appears only where the
//! variant's reveal rule allows it for the given viewer.

use serde::{Deserialize, Serialize};

use super::engine::Variant;
use crate::ai::AiStyle;
use crate::core::{Phase, PlayerId, Timer};
use crate::cycle::{Speech, VoteSummary};
use crate::games::undercover::UndercoverDetail;
use crate::games::werewolf::WerewolfDetail;

/// One roster entry as seen by the viewer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub display_name: String,
    pub is_ai: bool,
    pub ai_style: Option<AiStyle>,
    pub alive: bool,
    /// Present only when revealed to this viewer.
    pub role: Option<String>,
    /// Present only when revealed to this viewer.
    pub word: Option<String>,
}

/// Variant-specific part of the view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantDetail {
    Undercover(UndercoverDetail),
    Werewolf(WerewolfDetail),
}

/// Projected state for one viewer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicView {
    pub variant: Variant,
    pub phase: Phase,
    pub stage: Option<String>,
    pub round: u32,
    pub current_player: Option<PlayerId>,
    pub players: Vec<PlayerView>,
    pub speeches: Vec<Speech>,
    pub vote_summary: VoteSummary,
    pub vote_round: u32,
    pub eligible_targets: Vec<PlayerId>,
    pub winner: Option<String>,
    pub timer: Option<Timer>,
    pub detail: VariantDetail,
}

impl PublicView {
    /// Find a player's entry.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.id == id)
    }
}
