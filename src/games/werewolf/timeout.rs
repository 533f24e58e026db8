//! Countdown expiry for the night/day variant.

use tracing::debug;

use super::game::WerewolfGame;
use super::state::Stage;
use crate::ai::ensure_legal_target;
use crate::core::{EngineResult, GameEvent, PlayerId};
use crate::cycle::{Origin, TIMEOUT_SPEECH};

impl WerewolfGame {
    pub(super) fn handle_timeout(&mut self, event: &GameEvent) -> EngineResult<()> {
        let now = self.now();
        if !self.state.clock.timeout_applies(event, now) {
            return Ok(());
        }
        let record = self.state.clock.timeout_record(self.state.round, now);
        self.state.timeouts.push(record);
        debug!(stage = %self.state.stage, round = self.state.round, "countdown expired");

        match self.state.stage {
            Stage::NightWolves => {
                let wolves = self.state.alive_wolves();
                for wolf in &wolves {
                    self.count_default_action(*wolf);
                }
                let prey: Vec<PlayerId> = self
                    .state
                    .roster
                    .alive_ids()
                    .into_iter()
                    .filter(|p| !wolves.contains(p))
                    .collect();
                match self.state.rng.pick(&prey) {
                    Some(target) => {
                        self.submit_wolf_target(wolves.first().copied(), Some(target), Origin::Timeout)?;
                    }
                    None => self.after_wolves()?,
                }
            }
            Stage::NightSeer => match self.state.alive_seer() {
                Some(seer) => {
                    self.count_default_action(seer);
                    let candidates: Vec<PlayerId> = self
                        .state
                        .roster
                        .alive_ids()
                        .into_iter()
                        .filter(|p| *p != seer)
                        .collect();
                    match self.state.rng.pick(&candidates) {
                        Some(target) => {
                            self.submit_seer_target(Some(seer), Some(target), Origin::Timeout)?;
                        }
                        None => self.after_seer()?,
                    }
                }
                None => self.after_seer()?,
            },
            Stage::NightWitch => match self.state.alive_witch() {
                Some(witch) => {
                    self.count_default_action(witch);
                    self.submit_witch_action(Some(witch), false, false, None, Origin::Timeout)?;
                }
                None => self.resolve_night()?,
            },
            Stage::DayDiscussion => match self.state.speech.current() {
                Some(player) => {
                    self.count_default_action(player);
                    let content = event
                        .str_field("default_content")
                        .unwrap_or(TIMEOUT_SPEECH)
                        .to_string();
                    self.submit_speech(Some(player), &content, Origin::Timeout)?;
                }
                None => self.enter_day_vote(),
            },
            Stage::DayVote => {
                let alive = self.state.roster.alive_ids();
                let vote_round = self.state.votes.vote_round();
                for voter in self.state.votes.pending(&alive) {
                    if self.state.stage != Stage::DayVote || self.state.votes.vote_round() != vote_round {
                        break;
                    }
                    let eligible = self.state.votes.eligible_targets(&alive);
                    let target = ensure_legal_target(None, voter, &eligible, &mut self.state.rng);
                    self.count_default_action(voter);
                    self.submit_vote(Some(voter), Some(target), Origin::Timeout)?;
                }
            }
            Stage::End => {}
        }
        Ok(())
    }
}
