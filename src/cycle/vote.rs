//! Ballots and tally resolution.
//!
//! ## Finalization
//!
//! A vote finalizes once every alive player has cast a ballot:
//! - a single leader is eliminated
//! - a tie among a strict subset of eligible targets opens a revote
//!   restricted to the tied players
//! - a tie covering every eligible target is broken with the session RNG
//!
//! The last rule guarantees each revote narrows the field, so voting
//! always terminates.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{EngineError, EngineResult, GameRng, PlayerId};

/// Result of casting a ballot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Ballots still missing.
    Pending,
    /// Tally finalized with a single player removed.
    ///
    /// `tie_broken` is set whenever the leaders cover every eligible target,
    /// which can already happen in vote round 1 (e.g. three players voting
    /// in a cycle).
    Eliminated { player: PlayerId, tie_broken: bool },
    /// Tie: vote again among `candidates`.
    Revote { candidates: Vec<PlayerId>, vote_round: u32 },
}

/// One finalized tally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyRecord {
    pub round: u32,
    pub vote_round: u32,
    pub counts: BTreeMap<PlayerId, u32>,
    pub eliminated: Option<PlayerId>,
    pub tie_broken: bool,
}

/// Vote progress as shown to players.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSummary {
    pub submitted: usize,
    pub required: usize,
    pub tally: BTreeMap<PlayerId, u32>,
    /// The viewer's own ballot, if cast.
    pub self_target: Option<PlayerId>,
}

/// Ballot box for one elimination vote, including revotes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteBox {
    votes: BTreeMap<PlayerId, PlayerId>,
    vote_round: u32,
    revote_candidates: Vec<PlayerId>,
    history: Vec<TallyRecord>,
}

impl Default for VoteBox {
    fn default() -> Self {
        Self {
            votes: BTreeMap::new(),
            vote_round: 1,
            revote_candidates: Vec::new(),
            history: Vec::new(),
        }
    }
}

impl VoteBox {
    /// Open a fresh vote. History is kept.
    pub fn reset(&mut self) {
        self.votes.clear();
        self.vote_round = 1;
        self.revote_candidates.clear();
    }

    #[must_use]
    pub fn votes(&self) -> &BTreeMap<PlayerId, PlayerId> {
        &self.votes
    }

    #[must_use]
    pub fn vote_round(&self) -> u32 {
        self.vote_round
    }

    #[must_use]
    pub fn revote_candidates(&self) -> &[PlayerId] {
        &self.revote_candidates
    }

    #[must_use]
    pub fn history(&self) -> &[TallyRecord] {
        &self.history
    }

    #[must_use]
    pub fn has_voted(&self, voter: PlayerId) -> bool {
        self.votes.contains_key(&voter)
    }

    /// Targets a ballot may name: the revote set if any, else every alive player.
    #[must_use]
    pub fn eligible_targets(&self, alive: &[PlayerId]) -> Vec<PlayerId> {
        if self.revote_candidates.is_empty() {
            alive.to_vec()
        } else {
            self.revote_candidates
                .iter()
                .copied()
                .filter(|c| alive.contains(c))
                .collect()
        }
    }

    /// Alive players who have not voted yet, in `alive` order.
    #[must_use]
    pub fn pending(&self, alive: &[PlayerId]) -> Vec<PlayerId> {
        alive.iter().copied().filter(|p| !self.votes.contains_key(p)).collect()
    }

    /// Current count per target.
    #[must_use]
    pub fn tally(&self) -> BTreeMap<PlayerId, u32> {
        let mut counts: FxHashMap<PlayerId, u32> = FxHashMap::default();
        for target in self.votes.values() {
            *counts.entry(*target).or_insert(0) += 1;
        }
        counts.into_iter().collect()
    }

    #[must_use]
    pub fn summary(&self, alive_count: usize, viewer: Option<PlayerId>) -> VoteSummary {
        VoteSummary {
            submitted: self.votes.len(),
            required: alive_count,
            tally: self.tally(),
            self_target: viewer.and_then(|v| self.votes.get(&v).copied()),
        }
    }

    /// Check a ballot without recording it.
    pub fn validate(
        &self,
        voter: Option<PlayerId>,
        target: Option<PlayerId>,
        alive: &[PlayerId],
    ) -> EngineResult<(PlayerId, PlayerId)> {
        let voter = voter.ok_or_else(|| EngineError::InvalidTurn("vote requires an acting player".into()))?;
        let target = target.ok_or_else(|| EngineError::InvalidTarget("vote requires a target".into()))?;
        if self.votes.contains_key(&voter) {
            return Err(EngineError::InvalidTurn(format!("player {voter} already voted")));
        }
        if !alive.contains(&voter) {
            return Err(EngineError::InvalidTurn(format!("player {voter} is not alive")));
        }
        if !self.eligible_targets(alive).contains(&target) {
            return Err(EngineError::InvalidTarget(format!(
                "player {target} is not an eligible target"
            )));
        }
        Ok((voter, target))
    }

    /// Record a ballot and finalize once everyone alive has voted.
    pub fn cast(
        &mut self,
        voter: Option<PlayerId>,
        target: Option<PlayerId>,
        alive: &[PlayerId],
        round: u32,
        rng: &mut GameRng,
    ) -> EngineResult<VoteOutcome> {
        let (voter, target) = self.validate(voter, target, alive)?;
        self.votes.insert(voter, target);
        debug!(voter = %voter, target = %target, submitted = self.votes.len(), "vote recorded");

        if self.votes.len() < alive.len() {
            return Ok(VoteOutcome::Pending);
        }
        Ok(self.finalize(alive, round, rng))
    }

    fn finalize(&mut self, alive: &[PlayerId], round: u32, rng: &mut GameRng) -> VoteOutcome {
        let counts = self.tally();
        let top = counts.values().copied().max().unwrap_or(0);
        let leaders: Vec<PlayerId> = counts
            .iter()
            .filter(|(_, &count)| count == top)
            .map(|(&player, _)| player)
            .collect();
        let eligible = self.eligible_targets(alive);

        if leaders.len() > 1 && leaders.len() < eligible.len() {
            self.history.push(TallyRecord {
                round,
                vote_round: self.vote_round,
                counts,
                eliminated: None,
                tie_broken: false,
            });
            self.revote_candidates = leaders.clone();
            self.votes.clear();
            self.vote_round += 1;
            return VoteOutcome::Revote {
                candidates: leaders,
                vote_round: self.vote_round,
            };
        }

        let tie_broken = leaders.len() > 1;
        let Some(player) = rng_pick_leader(&leaders, tie_broken, rng) else {
            return VoteOutcome::Pending;
        };
        self.history.push(TallyRecord {
            round,
            vote_round: self.vote_round,
            counts,
            eliminated: Some(player),
            tie_broken,
        });
        VoteOutcome::Eliminated { player, tie_broken }
    }
}

fn rng_pick_leader(leaders: &[PlayerId], tie: bool, rng: &mut GameRng) -> Option<PlayerId> {
    if tie {
        rng.pick(leaders)
    } else {
        leaders.first().copied()
    }
}
