//! Night/day state machine: setup, day cycle and engine plumbing.
//!
//! Night handlers live in `night.rs`, countdown expiry in `timeout.rs`.

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};

use super::state::{
    check_winner, deal_roles, LastResult, NightLedger, Potions, Stage, WerewolfRole, WerewolfState,
    WerewolfWinner, MIN_PLAYERS,
};
use super::view;
use crate::ai::{ensure_legal_target, WerewolfSeat, WerewolfStrategy, WitchContext};
use crate::core::{
    countdown_secs, Countdown, DefaultAction, EngineError, EngineResult, GameEvent, GameRng,
    OutboundEvent, Participant, Phase, PhaseClock, PlayerAssignment, PlayerId, Roster,
    RosterUpdate, TimerMetadata, WerewolfConfig, TIMEOUT_EVENT,
};
use crate::cycle::{emit_speech_stream, sanitize_speech, Origin, Speech, SpeechQueue, VoteBox, VoteOutcome};
use crate::rules::{Collaborators, GameEngine, GameResult, PublicView, SessionSnapshot, Variant};

/// Prefix for outbound notification types.
pub(super) const EVENT_PREFIX: &str = "werewolf";

/// Parsed inbound event.
#[derive(Debug)]
enum Command {
    /// Host ends discussion early and opens the vote.
    StartVote,
    WolfTarget(Option<PlayerId>),
    SeerTarget(Option<PlayerId>),
    WitchAction {
        use_antidote: bool,
        use_poison: bool,
        target: Option<PlayerId>,
    },
    Speech(String),
    Vote(Option<PlayerId>),
    ForceResult,
    Timeout,
}

impl Command {
    fn parse(event: &GameEvent) -> EngineResult<Self> {
        match event.kind.as_str() {
            "ready" | "start_vote" => Ok(Self::StartVote),
            "submit_wolf_target" => Ok(Self::WolfTarget(event.player_field("target_id"))),
            "submit_seer_target" => Ok(Self::SeerTarget(event.player_field("target_id"))),
            "submit_witch_action" => Ok(Self::WitchAction {
                use_antidote: event.flag("use_antidote"),
                use_poison: event.flag("use_poison"),
                target: event.player_field("target_id"),
            }),
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

/// Night/day engine.
pub struct WerewolfGame {
    pub(super) state: WerewolfState,
    pub(super) strategy: WerewolfStrategy,
    pub(super) collaborators: Collaborators,
}

impl WerewolfGame {
    /// Deal roles and open the first night.
    pub fn start(
        config: WerewolfConfig,
        participants: &[Participant],
        collaborators: Collaborators,
        seed: u64,
    ) -> EngineResult<Self> {
        let players = participants.len();
        if players < MIN_PLAYERS {
            return Err(EngineError::Configuration(format!(
                "werewolf needs at least {MIN_PLAYERS} players, got {players}"
            )));
        }
        let counts = config.role_counts(players)?;

        let mut rng = GameRng::new(seed);
        let roles = deal_roles(counts, &mut rng);
        let assignments = participants
            .iter()
            .zip(roles)
            .map(|(participant, role)| {
                let mut assignment = PlayerAssignment::new(participant, role, "");
                if assignment.is_ai && assignment.ai_style.is_none() {
                    assignment.ai_style = Some(config.ai_style);
                }
                assignment
            })
            .collect();
        let roster = Roster::new(assignments)?;

        let mut clock = PhaseClock::new(Phase::Night);
        for player in roster.iter() {
            clock.push_roster_update(RosterUpdate::Assigned {
                player: player.id,
                role: player.role.as_str().to_string(),
                word: None,
            });
        }

        let has_witch = counts.witch > 0;
        let potions = Potions {
            antidote: has_witch && config.witch.antidote,
            poison: has_witch && config.witch.poison,
            allow_double: config.witch.allow_double,
        };

        let state = WerewolfState {
            config,
            clock,
            stage: Stage::NightWolves,
            round: 1,
            roster,
            potions,
            night: NightLedger::default(),
            speech: SpeechQueue::default(),
            votes: VoteBox::default(),
            last_result: LastResult::default(),
            seer_history: Vec::new(),
            winner: None,
            timeouts: Vec::new(),
            default_actions: Default::default(),
            rng,
        };
        let mut game = Self::from_state(state, collaborators);
        game.set_stage(Stage::NightWolves);
        Ok(game)
    }

    /// Resume from persisted state.
    pub fn from_state(state: WerewolfState, collaborators: Collaborators) -> Self {
        let generator = if state.config.use_llm {
            collaborators.text_generator.clone()
        } else {
            None
        };
        Self {
            strategy: WerewolfStrategy::new(generator),
            state,
            collaborators,
        }
    }

    #[must_use]
    pub fn state(&self) -> &WerewolfState {
        &self.state
    }

    pub(super) fn now(&self) -> DateTime<Utc> {
        self.collaborators.clock.now()
    }

    pub(super) fn ensure_stage(&self, expected: Stage) -> EngineResult<()> {
        if self.state.stage == expected {
            Ok(())
        } else {
            Err(EngineError::invalid_phase(expected.as_str(), self.state.stage.as_str()))
        }
    }

    /// Move to `stage` and arm its countdown.
    pub(super) fn set_stage(&mut self, stage: Stage) {
        self.state.stage = stage;
        let now = self.now();
        let countdown = self.countdown_for(stage);
        self.state.clock.enter_phase(stage.phase(), countdown, now);
        debug!(stage = %stage, round = self.state.round, "stage entered");
    }

    fn countdown_for(&self, stage: Stage) -> Option<Countdown> {
        let timers = &self.state.config.timers;
        let mut metadata = TimerMetadata {
            stage: Some(stage.as_str().to_string()),
            ..TimerMetadata::default()
        };
        let (secs, action) = match stage {
            Stage::NightWolves => (timers.night_wolves, DefaultAction::AutoWolfAttack),
            Stage::NightSeer => (timers.night_seer, DefaultAction::AutoSeerCheck),
            Stage::NightWitch => (timers.night_witch, DefaultAction::AutoWitchSkip),
            Stage::DayDiscussion => {
                let player = self.state.speech.current()?;
                metadata.current = Some(player);
                (timers.day_discussion, DefaultAction::AutoSpeech { player })
            }
            Stage::DayVote => {
                let pending = self.state.votes.pending(&self.state.roster.alive_ids());
                if pending.is_empty() {
                    return None;
                }
                metadata.pending = pending;
                (timers.day_vote, DefaultAction::AutoVote)
            }
            Stage::End => return None,
        };
        Some(
            Countdown::new(countdown_secs(secs), action)
                .describe(stage.as_str())
                .with_metadata(metadata),
        )
    }

    /// Open the day: everyone alive speaks in seat order.
    pub(super) fn enter_day(&mut self) {
        self.state.speech.clear_speeches();
        self.state.votes.reset();
        self.state.speech.reset(self.state.roster.alive_ids());
        self.set_stage(Stage::DayDiscussion);
    }

    pub(super) fn enter_day_vote(&mut self) {
        self.state.speech.clear_queue();
        self.state.votes.reset();
        self.set_stage(Stage::DayVote);
    }

    pub(super) fn submit_speech(
        &mut self,
        actor: Option<PlayerId>,
        raw: &str,
        origin: Origin,
    ) -> EngineResult<()> {
        self.ensure_stage(Stage::DayDiscussion)?;
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
            Some(_) => self.set_stage(Stage::DayDiscussion),
            None => self.enter_day_vote(),
        }
        Ok(())
    }

    pub(super) fn submit_vote(
        &mut self,
        actor: Option<PlayerId>,
        target: Option<PlayerId>,
        origin: Origin,
    ) -> EngineResult<()> {
        self.ensure_stage(Stage::DayVote)?;
        let alive = self.state.roster.alive_ids();
        let vote_round = self.state.votes.vote_round();
        let outcome = self
            .state
            .votes
            .cast(actor, target, &alive, self.state.round, &mut self.state.rng)?;

        if origin.is_artificial() {
            if let (Some(voter), Some(target)) = (actor, target) {
                let at = self.now();
                let payload = json!({
                    "playerId": voter,
                    "targetId": target,
                    "playerName": self.state.roster.display_name(voter),
                    "targetName": self.state.roster.display_name(target),
                    "voteRound": vote_round,
                    "timestamp": at.to_rfc3339(),
                });
                self.state
                    .clock
                    .emit_event(format!("{EVENT_PREFIX}.vote_cast"), payload);
            }
        }

        match outcome {
            VoteOutcome::Pending => {}
            VoteOutcome::Revote { candidates, vote_round } => {
                info!(round = self.state.round, vote_round, candidates = ?candidates, "tie, revote");
                self.set_stage(Stage::DayVote);
            }
            VoteOutcome::Eliminated { player, tie_broken } => self.lynch(player, tie_broken)?,
        }
        Ok(())
    }

    fn lynch(&mut self, player: PlayerId, tie_broken: bool) -> EngineResult<()> {
        if self.state.roster.eliminate(player, true)? {
            self.state
                .clock
                .push_roster_update(RosterUpdate::Eliminated { player });
        }
        self.state.last_result.lynched = Some(player);
        info!(player = %player, round = self.state.round, tie_broken, "player voted out");

        match check_winner(&self.state.roster) {
            Some(winner) => self.finish(Some(winner)),
            None => {
                self.state.round += 1;
                self.state.night = NightLedger::default();
                self.set_stage(Stage::NightWolves);
            }
        }
        Ok(())
    }

    /// Enter the terminal stage, revealing everyone.
    pub(super) fn finish(&mut self, winner: Option<WerewolfWinner>) {
        if winner.is_some() {
            self.state.winner = winner;
        }
        self.state.speech.clear_queue();
        self.state.roster.reveal_all();
        self.state.clock.clear_timer();
        self.set_stage(Stage::End);
        info!(winner = ?self.state.winner, round = self.state.round, "game finished");
    }

    pub(super) fn count_default_action(&mut self, player: PlayerId) {
        *self.state.default_actions.entry(player).or_insert(0) += 1;
    }

    /// Seat context for an artificial player.
    fn seat<'a>(&'a self, me: &'a PlayerAssignment<WerewolfRole>) -> WerewolfSeat<'a> {
        WerewolfSeat {
            me,
            style: me.ai_style.unwrap_or(self.state.config.ai_style),
            roster: &self.state.roster,
            round: self.state.round,
            speeches: self.state.speech.speeches(),
            last_result: &self.state.last_result,
            seer_history: &self.state.seer_history,
        }
    }

    fn auto_wolves(&mut self) -> EngineResult<bool> {
        let wolves = self.state.alive_wolves();
        let Some(&leader) = wolves.first() else {
            self.after_wolves()?;
            return Ok(true);
        };
        if wolves.iter().any(|w| !self.state.roster.is_ai(*w)) {
            return Ok(false);
        }
        let me = self.state.roster.get(leader)?.clone();
        let prey: Vec<PlayerId> = self
            .state
            .roster
            .alive_ids()
            .into_iter()
            .filter(|p| !wolves.contains(p))
            .collect();

        let mut rng = self.state.rng.clone();
        let choice = self.strategy.wolf_target(&self.seat(&me), &mut rng);
        let target = ensure_legal_target(choice, leader, &prey, &mut rng);
        self.state.rng = rng;

        self.submit_wolf_target(Some(leader), Some(target), Origin::Artificial)?;
        Ok(true)
    }

    fn auto_seer(&mut self) -> EngineResult<bool> {
        let Some(seer) = self.state.alive_seer() else {
            self.after_seer()?;
            return Ok(true);
        };
        if !self.state.roster.is_ai(seer) {
            return Ok(false);
        }
        let me = self.state.roster.get(seer)?.clone();
        let candidates: Vec<PlayerId> = self
            .state
            .roster
            .alive_ids()
            .into_iter()
            .filter(|p| *p != seer)
            .collect();

        let mut rng = self.state.rng.clone();
        let choice = self.strategy.seer_target(&self.seat(&me), &mut rng);
        let target = ensure_legal_target(choice, seer, &candidates, &mut rng);
        self.state.rng = rng;

        self.submit_seer_target(Some(seer), Some(target), Origin::Artificial)?;
        Ok(true)
    }

    fn auto_witch(&mut self) -> EngineResult<bool> {
        let Some(witch) = self.state.alive_witch() else {
            self.resolve_night()?;
            return Ok(true);
        };
        if !self.state.roster.is_ai(witch) {
            return Ok(false);
        }
        let me = self.state.roster.get(witch)?.clone();
        let pending = self.state.night.wolves_target;
        let potions = self.state.potions;
        let context = WitchContext {
            pending_kill: pending,
            potions,
        };

        let mut rng = self.state.rng.clone();
        let decision = self.strategy.witch_action(&self.seat(&me), &context, &mut rng);
        self.state.rng = rng;

        let use_antidote = decision.use_antidote && potions.antidote && pending.is_some();
        let poison = decision.poison.filter(|t| {
            potions.poison
                && *t != witch
                && Some(*t) != pending
                && self.state.roster.is_alive(*t)
                && (!use_antidote || potions.allow_double)
        });
        self.submit_witch_action(Some(witch), use_antidote, poison.is_some(), poison, Origin::Artificial)?;
        Ok(true)
    }

    fn auto_speech(&mut self) -> EngineResult<bool> {
        let Some(speaker) = self.state.speech.current() else {
            return Ok(false);
        };
        if !self.state.roster.is_ai(speaker) {
            return Ok(false);
        }
        let me = self.state.roster.get(speaker)?.clone();

        let mut rng = self.state.rng.clone();
        let text = self.strategy.speak(&self.seat(&me), &mut rng);
        self.state.rng = rng;

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

        let mut rng = self.state.rng.clone();
        let decision = self.strategy.vote(&self.seat(&me), &eligible, &mut rng);
        let target = ensure_legal_target(decision.target, voter, &eligible, &mut rng);
        self.state.rng = rng;

        if let Some(reason) = decision.reason.as_deref() {
            info!(voter = %voter, target = %target, source = decision.source.as_str(), reason, "ai vote");
        }
        self.submit_vote(Some(voter), Some(target), Origin::Artificial)?;
        Ok(true)
    }
}

impl GameEngine for WerewolfGame {
    fn variant(&self) -> Variant {
        Variant::Werewolf
    }

    fn phase_clock(&self) -> &PhaseClock {
        &self.state.clock
    }

    fn round(&self) -> u32 {
        self.state.round
    }

    fn stage(&self) -> Option<&'static str> {
        Some(self.state.stage.as_str())
    }

    fn current_actor(&self) -> Option<PlayerId> {
        match self.state.stage {
            Stage::NightSeer => self.state.alive_seer(),
            Stage::NightWitch => self.state.alive_witch(),
            Stage::DayDiscussion => self.state.speech.current(),
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
        debug!(event = %event.kind, actor = ?event.actor, stage = %self.state.stage, "handling event");

        match command {
            Command::StartVote => {
                self.ensure_stage(Stage::DayDiscussion)?;
                self.enter_day_vote();
            }
            Command::WolfTarget(target) => self.submit_wolf_target(event.actor, target, Origin::Human)?,
            Command::SeerTarget(target) => self.submit_seer_target(event.actor, target, Origin::Human)?,
            Command::WitchAction {
                use_antidote,
                use_poison,
                target,
            } => self.submit_witch_action(event.actor, use_antidote, use_poison, target, Origin::Human)?,
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
            let acted = match self.state.stage {
                Stage::NightWolves => self.auto_wolves()?,
                Stage::NightSeer => self.auto_seer()?,
                Stage::NightWitch => self.auto_witch()?,
                Stage::DayDiscussion => self.auto_speech()?,
                Stage::DayVote => self.auto_vote()?,
                Stage::End => false,
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
        self.state.stage == Stage::End
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::Werewolf(Box::new(self.state.clone()))
    }

    fn restore(&mut self, snapshot: SessionSnapshot) -> EngineResult<()> {
        match snapshot {
            SessionSnapshot::Werewolf(state) => {
                self.state = *state;
                Ok(())
            }
            other => Err(EngineError::Configuration(format!(
                "cannot restore a {} snapshot into a werewolf session",
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
    use crate::ports::{PassthroughFilter, StaticWordPool};

    fn collaborators() -> Collaborators {
        Collaborators::new(
            Arc::new(PassthroughFilter),
            Arc::new(StaticWordPool::default()),
            Arc::new(ManualClock::at_epoch()),
        )
    }

    fn humans(n: u64) -> Vec<Participant> {
        (1..=n).map(|i| Participant::human(i, format!("P{i}"))).collect()
    }

    #[test]
    fn test_start_requires_four_players() {
        assert!(matches!(
            WerewolfGame::start(WerewolfConfig::default(), &humans(3), collaborators(), 1),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_start_opens_first_night() {
        let game = WerewolfGame::start(WerewolfConfig::default(), &humans(6), collaborators(), 9).unwrap();
        let state = game.state();

        assert_eq!(state.stage, Stage::NightWolves);
        assert_eq!(state.clock.phase(), Phase::Night);
        assert_eq!(state.round, 1);
        assert!(state.potions.antidote && state.potions.poison);
        assert_eq!(state.alive_wolves().len(), 1);
        assert!(state.seer().is_some());
        assert!(state.witch().is_some());
        assert_eq!(
            state.clock.timer().and_then(|t| t.metadata.stage.clone()).as_deref(),
            Some("night.wolves")
        );
    }

    #[test]
    fn test_no_potions_without_witch() {
        let game = WerewolfGame::start(WerewolfConfig::default(), &humans(4), collaborators(), 2).unwrap();
        assert!(game.state().witch().is_none());
        assert!(!game.state().potions.antidote);
        assert!(!game.state().potions.poison);
    }

    #[test]
    fn test_start_vote_only_during_discussion() {
        let mut game = WerewolfGame::start(WerewolfConfig::default(), &humans(4), collaborators(), 2).unwrap();
        assert_eq!(
            game.handle_event(&GameEvent::new("ready")).unwrap_err(),
            EngineError::invalid_phase("day.discussion", "night.wolves")
        );
    }

    #[test]
    fn test_force_result_ends_game() {
        let mut game = WerewolfGame::start(WerewolfConfig::default(), &humans(4), collaborators(), 2).unwrap();
        game.handle_event(&GameEvent::new("force_result")).unwrap();
        assert!(game.is_finished());
        assert_eq!(game.state().clock.phase(), Phase::Ended);
        assert!(game.state().clock.timer().is_none());
        assert!(game.result().is_none());
    }
}
