//! Countdown expiry for the word-guess variant.
//!
//! - preparing: start speaking
//! - speaking: submit a placeholder speech for the current speaker
//! - voting: cast a random legal ballot for every pending voter

use tracing::debug;

use super::game::UndercoverGame;
use crate::ai::ensure_legal_target;
use crate::core::{EngineResult, GameEvent, Phase};
use crate::cycle::{Origin, TIMEOUT_SPEECH};

impl UndercoverGame {
    pub(super) fn handle_timeout(&mut self, event: &GameEvent) -> EngineResult<()> {
        let now = self.now();
        if !self.state.clock.timeout_applies(event, now) {
            return Ok(());
        }
        let record = self.state.clock.timeout_record(self.state.round, now);
        self.state.timeouts.push(record);

        match self.state.clock.phase() {
            Phase::Preparing => {
                debug!("preparing countdown expired");
                self.enter_speaking(true);
            }
            Phase::Speaking => match self.state.speech.current() {
                Some(player) => {
                    debug!(player = %player, "speaking countdown expired");
                    self.count_default_action(player);
                    let content = event
                        .str_field("default_content")
                        .unwrap_or(TIMEOUT_SPEECH)
                        .to_string();
                    self.submit_speech(Some(player), &content, Origin::Timeout)?;
                }
                None => self.enter_voting(),
            },
            Phase::Voting => {
                let alive = self.state.roster.alive_ids();
                let vote_round = self.state.votes.vote_round();
                for voter in self.state.votes.pending(&alive) {
                    if self.state.clock.phase() != Phase::Voting
                        || self.state.votes.vote_round() != vote_round
                    {
                        break;
                    }
                    let eligible = self.state.votes.eligible_targets(&alive);
                    let target = ensure_legal_target(None, voter, &eligible, &mut self.state.rng);
                    debug!(voter = %voter, target = %target, "voting countdown expired");
                    self.count_default_action(voter);
                    self.submit_vote(Some(voter), Some(target), Origin::Timeout)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
