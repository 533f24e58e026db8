//! Word-guess state machine.

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};

use super::state::{
    check_winner, deal_roles, UndercoverRole, UndercoverState, UndercoverWinner, VoteReveal,
    MIN_PLAYERS,
};
use super::view;
use crate::ai::{ensure_legal_target, UndercoverSeat, UndercoverStrategy};
use crate::core::{
    countdown_secs, Countdown, DefaultAction, EngineError, EngineResult, GameEvent, GameRng,
    OutboundEvent, Participant, Phase, PhaseClock, PlayerAssignment, PlayerId, Roster,
    RosterUpdate, TimerMetadata, UndercoverConfig, TIMEOUT_EVENT,
};
use crate::cycle::{emit_speech_stream, sanitize_speech, Origin, Speech, SpeechQueue, VoteBox, VoteOutcome};
use crate::rules::{Collaborators, GameEngine, GameResult, PublicView, SessionSnapshot, Variant};

/// Prefix for outbound notification types.
pub(super) const EVENT_PREFIX: &str = "undercover";

/// Parsed inbound event.
#[derive(Debug)]
enum Command {
    Ready,
    Speech(String),
    Vote(Option<PlayerId>),
    ForceResult,
    Timeout,
}

impl Command {
    fn parse(event: &GameEvent) -> EngineResult<Self> {
        match event.kind.as_str() {
            "ready" | "start_discussion" => Ok(Self::Ready),
            "submit_speech" => Ok(Self::Speech(
                event.str_field("content").unwrap_or_default().to_string(),
            )),
            "submit_vote" => Ok(Self::Vote(event.player_field("target_id"))),
            "force_result" => Ok(Self::ForceResult),
            TIMEOUT_EVENT => Ok(Self::Timeout),
            other => Err(EngineError::UnknownEvent(other.to_string())),
        }
    }
}

/// Word-guess engine.
pub struct UndercoverGame {
    pub(super) state: UndercoverState,
    pub(super) strategy: UndercoverStrategy,
    pub(super) collaborators: Collaborators,
}

impl UndercoverGame {
    /// Deal roles and words and open the preparing phase.
    pub fn start(
        config: UndercoverConfig,
        participants: &[Participant],
        collaborators: Collaborators,
        seed: u64,
    ) -> EngineResult<Self> {
        let players = participants.len();
        if players < MIN_PLAYERS {
            return Err(EngineError::Configuration(format!(
                "undercover needs at least {MIN_PLAYERS} players, got {players}"
            )));
        }
        let undercover = config.effective_undercover();
        let blank = config.blank_count as usize;
        if undercover + blank >= players {
            return Err(EngineError::Configuration(format!(
                "{undercover} undercover and {blank} blank leave no civilians among {players} players"
            )));
        }

        let mut rng = GameRng::new(seed);
        let candidates = collaborators
            .word_pool
            .candidates(config.topic.as_deref(), config.difficulty.as_deref());
        let word_pair = rng.choose(&candidates).cloned().ok_or_else(|| {
            EngineError::Configuration("no word pairs match the configured topic and difficulty".into())
        })?;

        let mut order: Vec<usize> = (0..players).collect();
        rng.shuffle(&mut order);
        let roles = deal_roles(players, undercover, blank, &mut rng);

        let assignments = order
            .iter()
            .map(|&seat| {
                let role = roles[seat];
                let word = match role {
                    UndercoverRole::Civilian => word_pair.civilian_word.as_str(),
                    UndercoverRole::Undercover => word_pair.undercover_word.as_str(),
                    UndercoverRole::Blank => "",
                };
                let mut assignment = PlayerAssignment::new(&participants[seat], role, word);
                if assignment.is_ai && assignment.ai_style.is_none() {
                    assignment.ai_style = Some(config.ai_style);
                }
                assignment
            })
            .collect();
        let roster = Roster::new(assignments)?;

        let mut clock = PhaseClock::new(Phase::Preparing);
        for player in roster.iter() {
            clock.push_roster_update(RosterUpdate::Assigned {
                player: player.id,
                role: player.role.as_str().to_string(),
                word: Some(player.word.clone()),
            });
        }

        let state = UndercoverState {
            config,
            clock,
            round: 1,
            roster,
            speech: SpeechQueue::default(),
            votes: VoteBox::default(),
            ai_vote_reveals: Vec::new(),
            word_pair,
            winner: None,
            timeouts: Vec::new(),
            default_actions: Default::default(),
            rng,
        };
        let mut game = Self::from_state(state, collaborators);
        game.arm_preparing();
        Ok(game)
    }

    /// Resume from persisted state.
    pub fn from_state(state: UndercoverState, collaborators: Collaborators) -> Self {
        let generator = if state.config.use_llm {
            collaborators.text_generator.clone()
        } else {
            None
        };
        Self {
            strategy: UndercoverStrategy::new(generator),
            state,
            collaborators,
        }
    }

    #[must_use]
    pub fn state(&self) -> &UndercoverState {
        &self.state
    }

    pub(super) fn now(&self) -> DateTime<Utc> {
        self.collaborators.clock.now()
    }

    fn arm_preparing(&mut self) {
        let now = self.now();
        let countdown = Countdown::new(
            countdown_secs(self.state.config.timers.preparing),
            DefaultAction::AutoStart,
        )
        .describe("preparing");
        self.state.clock.enter_phase(Phase::Preparing, Some(countdown), now);
    }

    /// Open a speaking pass over every alive player.
    pub(super) fn enter_speaking(&mut self, auto: bool) {
        self.state.speech.reset(self.state.roster.alive_ids());
        debug!(round = self.state.round, "speaking phase");
        self.arm_speaking(auto);
    }

    fn arm_speaking(&mut self, auto: bool) {
        let now = self.now();
        let secs = countdown_secs(self.state.config.timers.speaking);
        let countdown = self.state.speech.current().map(|player| {
            Countdown::new(secs, DefaultAction::AutoSpeech { player })
                .describe("speaking")
                .with_metadata(TimerMetadata {
                    current: Some(player),
                    auto,
                    ..TimerMetadata::default()
                })
        });
        self.state.clock.enter_phase(Phase::Speaking, countdown, now);
    }

    /// Open a fresh vote.
    pub(super) fn enter_voting(&mut self) {
        self.state.votes.reset();
        self.state.ai_vote_reveals.clear();
        debug!(round = self.state.round, "voting phase");
        self.arm_voting();
    }

    fn arm_voting(&mut self) {
        let now = self.now();
        let secs = countdown_secs(self.state.config.timers.voting);
        let pending = self.state.votes.pending(&self.state.roster.alive_ids());
        let countdown = (!pending.is_empty()).then(|| {
            Countdown::new(secs, DefaultAction::AutoVote)
                .describe("voting")
                .with_metadata(TimerMetadata {
                    pending,
                    ..TimerMetadata::default()
                })
        });
        self.state.clock.enter_phase(Phase::Voting, countdown, now);
    }

    /// Record the current speaker's speech.
    pub(super) fn submit_speech(
        &mut self,
        actor: Option<PlayerId>,
        raw: &str,
        origin: Origin,
    ) -> EngineResult<()> {
        self.state.clock.ensure_phase(Phase::Speaking)?;
        let speaker = self.state.speech.ensure_turn(actor)?;
        let content = sanitize_speech(self.collaborators.content_filter.as_ref(), raw, origin)?;
        let at = self.now();

        if origin.is_artificial() {
            emit_speech_stream(&mut self.state.clock, EVENT_PREFIX, speaker, &content, at);
        }
        let next = self.state.speech.record(Speech {
            player: speaker,
            content,
            is_ai: origin.is_artificial(),
            round: self.state.round,
            at,
        });
        debug!(player = %speaker, round = self.state.round, "speech recorded");

        match next {
            Some(_) => self.arm_speaking(origin == Origin::Timeout),
            None => self.enter_voting(),
        }
        Ok(())
    }

    /// Record a ballot and resolve the vote when complete.
    pub(super) fn submit_vote(
        &mut self,
        actor: Option<PlayerId>,
        target: Option<PlayerId>,
        origin: Origin,
    ) -> EngineResult<()> {
        self.state.clock.ensure_phase(Phase::Voting)?;
        let alive = self.state.roster.alive_ids();
        let vote_round = self.state.votes.vote_round();
        let outcome = self
            .state
            .votes
            .cast(actor, target, &alive, self.state.round, &mut self.state.rng)?;

        if origin.is_artificial() {
            if let (Some(voter), Some(target)) = (actor, target) {
                self.reveal_ai_vote(voter, target, vote_round);
            }
        }

        match outcome {
            VoteOutcome::Pending => {}
            VoteOutcome::Revote { candidates, vote_round } => {
                info!(round = self.state.round, vote_round, candidates = ?candidates, "tie, revote");
                self.arm_voting();
            }
            VoteOutcome::Eliminated { player, tie_broken } => self.eliminate(player, tie_broken)?,
        }
        Ok(())
    }

    fn reveal_ai_vote(&mut self, voter: PlayerId, target: PlayerId, vote_round: u32) {
        let at = self.now();
        let voter_name = self.state.roster.display_name(voter);
        let target_name = self.state.roster.display_name(target);
        self.state.clock.emit_event(
            format!("{EVENT_PREFIX}.vote_cast"),
            json!({
                "playerId": voter,
                "targetId": target,
                "playerName": voter_name,
                "targetName": target_name,
                "voteRound": vote_round,
                "timestamp": at.to_rfc3339(),
            }),
        );
        self.state.ai_vote_reveals.push(VoteReveal {
            voter,
            target,
            voter_name,
            target_name,
            vote_round,
            at,
        });
    }

    fn eliminate(&mut self, player: PlayerId, tie_broken: bool) -> EngineResult<()> {
        self.state.roster.eliminate(player, false)?;
        self.state
            .clock
            .push_roster_update(RosterUpdate::Eliminated { player });
        info!(player = %player, round = self.state.round, tie_broken, "player eliminated");

        match check_winner(&self.state.roster) {
            Some(winner) => self.finish(Some(winner)),
            None => {
                self.state.round += 1;
                self.state.speech.clear_speeches();
                self.state.votes.reset();
                self.state.ai_vote_reveals.clear();
                self.enter_speaking(false);
            }
        }
        Ok(())
    }

    /// Enter the terminal phase.
    pub(super) fn finish(&mut self, winner: Option<UndercoverWinner>) {
        if winner.is_some() {
            self.state.winner = winner;
        }
        self.state.speech.clear_queue();
        self.state.roster.reveal_all();
        self.state.clock.clear_timer();
        self.state.clock.set_phase(Phase::Result);
        info!(winner = ?self.state.winner, round = self.state.round, "game finished");
    }

    pub(super) fn count_default_action(&mut self, player: PlayerId) {
        *self.state.default_actions.entry(player).or_insert(0) += 1;
    }

    fn auto_speech(&mut self) -> EngineResult<bool> {
        let Some(speaker) = self.state.speech.current() else {
            return Ok(false);
        };
        if !self.state.roster.is_ai(speaker) {
            return Ok(false);
        }
        let me = self.state.roster.get(speaker)?.clone();
        let seat = UndercoverSeat {
            me: &me,
            style: me.ai_style.unwrap_or(self.state.config.ai_style),
            roster: &self.state.roster,
            round: self.state.round,
            speeches: self.state.speech.speeches(),
            topic: self.state.word_pair.topic.as_deref(),
        };
        let text = self.strategy.speak(&seat, &mut self.state.rng);
        self.submit_speech(Some(speaker), &text, Origin::Artificial)?;
        Ok(true)
    }

    fn auto_vote(&mut self) -> EngineResult<bool> {
        let alive = self.state.roster.alive_ids();
        let Some(voter) = self
            .state
            .votes
            .pending(&alive)
            .into_iter()
            .find(|p| self.state.roster.is_ai(*p))
        else {
            return Ok(false);
        };
        let eligible = self.state.votes.eligible_targets(&alive);
        let me = self.state.roster.get(voter)?.clone();
        let seat = UndercoverSeat {
            me: &me,
            style: me.ai_style.unwrap_or(self.state.config.ai_style),
            roster: &self.state.roster,
            round: self.state.round,
            speeches: self.state.speech.speeches(),
            topic: self.state.word_pair.topic.as_deref(),
        };
        let decision = self.strategy.vote(&seat, &eligible, &mut self.state.rng);
        let target = ensure_legal_target(decision.target, voter, &eligible, &mut self.state.rng);
        if let Some(reason) = decision.reason.as_deref() {
            info!(voter = %voter, target = %target, source = decision.source.as_str(), reason, "ai vote");
        }
        self.submit_vote(Some(voter), Some(target), Origin::Artificial)?;
        Ok(true)
    }
}

impl GameEngine for UndercoverGame {
    fn variant(&self) -> Variant {
        Variant::Undercover
    }

    fn phase_clock(&self) -> &PhaseClock {
        &self.state.clock
    }

    fn round(&self) -> u32 {
        self.state.round
    }

    fn stage(&self) -> Option<&'static str> {
        None
    }

    fn current_actor(&self) -> Option<PlayerId> {
        match self.state.clock.phase() {
            Phase::Speaking => self.state.speech.current(),
            _ => None,
        }
    }

    fn handle_event(&mut self, event: &GameEvent) -> EngineResult<()> {
        let command = Command::parse(event)?;
        if let Some(actor) = event.actor {
            if !self.state.roster.contains(actor) {
                return Err(EngineError::UnknownPlayer(actor));
            }
        }
        debug!(event = %event.kind, actor = ?event.actor, phase = %self.state.clock.phase(), "handling event");

        match command {
            Command::Ready => {
                self.state.clock.ensure_phase(Phase::Preparing)?;
                self.enter_speaking(false);
            }
            Command::Speech(content) => self.submit_speech(event.actor, &content, Origin::Human)?,
            Command::Vote(target) => self.submit_vote(event.actor, target, Origin::Human)?,
            Command::ForceResult => self.finish(None),
            Command::Timeout => self.handle_timeout(event)?,
        }
        Ok(())
    }

    fn run_auto_actions(&mut self) -> EngineResult<bool> {
        let mut progressed = false;
        loop {
            let acted = match self.state.clock.phase() {
                Phase::Speaking => self.auto_speech()?,
                Phase::Voting => self.auto_vote()?,
                _ => false,
            };
            if !acted {
                break;
            }
            progressed = true;
        }
        Ok(progressed)
    }

    fn public_view(&self, viewer: Option<PlayerId>) -> PublicView {
        view::project(&self.state, viewer)
    }

    fn result(&self) -> Option<GameResult> {
        self.state.winner.map(|winner| GameResult {
            faction: winner.as_str().to_string(),
            winners: self
                .state
                .roster
                .iter()
                .filter(|p| winner.includes(p.role))
                .map(|p| p.id)
                .collect(),
        })
    }

    fn is_finished(&self) -> bool {
        self.state.clock.phase() == Phase::Result
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::Undercover(Box::new(self.state.clone()))
    }

    fn restore(&mut self, snapshot: SessionSnapshot) -> EngineResult<()> {
        match snapshot {
            SessionSnapshot::Undercover(state) => {
                self.state = *state;
                Ok(())
            }
            other => Err(EngineError::Configuration(format!(
                "cannot restore a {} snapshot into an undercover session",
                other.variant()
            ))),
        }
    }

    fn drain_events(&mut self) -> Vec<OutboundEvent> {
        self.state.clock.drain_events()
    }

    fn drain_roster_updates(&mut self) -> Vec<RosterUpdate> {
        self.state.clock.drain_roster_updates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::core::ManualClock;
    use crate::ports::{PassthroughFilter, StaticWordPool, WordPair};

    fn collaborators() -> Collaborators {
        Collaborators::new(
            Arc::new(PassthroughFilter),
            Arc::new(StaticWordPool::new(vec![WordPair::new("apple", "pear")])),
            Arc::new(ManualClock::at_epoch()),
        )
    }

    fn humans(n: u64) -> Vec<Participant> {
        (1..=n).map(|i| Participant::human(i, format!("P{i}"))).collect()
    }

    #[test]
    fn test_start_requires_three_players() {
        let err = UndercoverGame::start(UndercoverConfig::default(), &humans(2), collaborators(), 1)
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_start_rejects_no_civilians() {
        let config = UndercoverConfig::default().with_undercover(2).with_blanks(1);
        assert!(matches!(
            UndercoverGame::start(config, &humans(3), collaborators(), 1),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_start_rejects_empty_pool() {
        let collab = Collaborators::new(
            Arc::new(PassthroughFilter),
            Arc::new(StaticWordPool::default()),
            Arc::new(ManualClock::at_epoch()),
        );
        assert!(matches!(
            UndercoverGame::start(UndercoverConfig::default(), &humans(4), collab, 1),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_start_assigns_words() {
        let config = UndercoverConfig::default().with_blanks(1);
        let game = UndercoverGame::start(config, &humans(5), collaborators(), 3).unwrap();
        let state = game.state();

        assert_eq!(state.clock.phase(), Phase::Preparing);
        assert_eq!(state.round, 1);
        for player in state.roster.iter() {
            let expected = match player.role {
                UndercoverRole::Civilian => "apple",
                UndercoverRole::Undercover => "pear",
                UndercoverRole::Blank => "",
            };
            assert_eq!(player.word, expected);
        }
        assert_eq!(state.roster.with_role(UndercoverRole::Blank).len(), 1);
        assert_eq!(state.roster.with_role(UndercoverRole::Undercover).len(), 1);
    }

    #[test]
    fn test_unknown_event_and_actor() {
        let mut game = UndercoverGame::start(UndercoverConfig::default(), &humans(3), collaborators(), 1).unwrap();
        assert_eq!(
            game.handle_event(&GameEvent::new("dance")).unwrap_err(),
            EngineError::UnknownEvent("dance".into())
        );
        assert_eq!(
            game.handle_event(&GameEvent::new("ready").with_actor(PlayerId(42))).unwrap_err(),
            EngineError::UnknownPlayer(PlayerId(42))
        );
    }

    #[test]
    fn test_ready_only_in_preparing() {
        let mut game = UndercoverGame::start(UndercoverConfig::default(), &humans(3), collaborators(), 1).unwrap();
        game.handle_event(&GameEvent::new("ready")).unwrap();
        assert_eq!(game.state().clock.phase(), Phase::Speaking);
        assert!(matches!(
            game.handle_event(&GameEvent::new("ready")),
            Err(EngineError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn test_snapshot_restores_same_variant() {
        let mut game = UndercoverGame::start(UndercoverConfig::default(), &humans(3), collaborators(), 1).unwrap();
        let snapshot = game.snapshot();
        assert!(game.restore(snapshot).is_ok());
    }
}
