//! Speech and vote decisions for the word-guess variant.

use std::sync::Arc;
use std::time::Instant;

use super::decision::{last_mentioned, Decision, DecisionSource};
use super::telemetry::{record_decision, DecisionKind};
use super::model::ModelBackend;
use super::prompt::{
    format_candidates, format_history, system_prompt, DECISION_FORMAT, SPEECH_MAX_TOKENS,
    VOTE_MAX_TOKENS, VOTE_TEMPERATURE,
};
use super::style::AiStyle;
use crate::core::{GameRng, PlayerAssignment, PlayerId, Roster};
use crate::cycle::Speech;
use crate::games::undercover::UndercoverRole;
use crate::ports::{GenerationRequest, TextGenerator};

/// Chance a heuristic vote goes to the opposing side when nobody was named.
const FACTION_BIAS: f64 = 0.6;

/// What an artificial player knows when it is their turn.
#[derive(Clone, Copy, Debug)]
pub struct UndercoverSeat<'a> {
    pub me: &'a PlayerAssignment<UndercoverRole>,
    pub style: AiStyle,
    pub roster: &'a Roster<UndercoverRole>,
    pub round: u32,
    pub speeches: &'a [Speech],
    pub topic: Option<&'a str>,
}

/// One per session; shared by every artificial player in it.
#[derive(Clone, Debug, Default)]
pub struct UndercoverStrategy {
    model: ModelBackend,
}

impl UndercoverStrategy {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self {
            model: ModelBackend::new(generator),
        }
    }

    /// Produce a speech, from the model when possible.
    pub fn speak(&self, seat: &UndercoverSeat<'_>, rng: &mut GameRng) -> String {
        let started = Instant::now();
        let generated = self
            .model
            .is_configured()
            .then(|| self.model.speech(&speech_request(seat)))
            .flatten();
        if let Some(text) = generated {
            record_decision(DecisionKind::Speech, DecisionSource::Model, started.elapsed());
            return text;
        }
        let text = template_speech(seat, rng);
        record_decision(DecisionKind::Speech, DecisionSource::Heuristic, started.elapsed());
        text
    }

    /// Pick a vote target from `eligible`.
    pub fn vote(&self, seat: &UndercoverSeat<'_>, eligible: &[PlayerId], rng: &mut GameRng) -> Decision {
        let started = Instant::now();
        let decision = self
            .model
            .is_configured()
            .then(|| self.model.decision(&vote_request(seat, eligible), seat.me.id, eligible))
            .flatten()
            .unwrap_or_else(|| Decision::heuristic(heuristic_vote(seat, eligible, rng)));
        record_decision(DecisionKind::Vote, decision.source, started.elapsed());
        decision
    }
}

fn word_line(me: &PlayerAssignment<UndercoverRole>) -> String {
    if me.word.is_empty() {
        "You have no word (you are blank). Blend in without being caught.".to_string()
    } else {
        format!("Your word is \"{}\". You do not know whether it is the majority word.", me.word)
    }
}

fn speech_request(seat: &UndercoverSeat<'_>) -> GenerationRequest {
    let topic = seat
        .topic
        .map(|t| format!("The topic is {t}.\n"))
        .unwrap_or_default();
    let prompt = format!(
        "{topic}{}\nRound {}. Recent speeches:\n{}\
         Describe your word in one short first-person sentence without saying it.",
        word_line(seat.me),
        seat.round,
        format_history(seat.speeches, seat.roster),
    );
    GenerationRequest::new(prompt)
        .with_system_prompt(system_prompt("Who is the Undercover", seat.style))
        .with_max_tokens(SPEECH_MAX_TOKENS)
}

fn vote_request(seat: &UndercoverSeat<'_>, eligible: &[PlayerId]) -> GenerationRequest {
    let candidates: Vec<PlayerId> = eligible.iter().copied().filter(|p| *p != seat.me.id).collect();
    let prompt = format!(
        "{}\nRound {}. Recent speeches:\n{}Players you may vote for:\n{}\
         Vote for the player whose description fits your word least. {DECISION_FORMAT}",
        word_line(seat.me),
        seat.round,
        format_history(seat.speeches, seat.roster),
        format_candidates(&candidates, seat.roster),
    );
    GenerationRequest::new(prompt)
        .with_system_prompt(system_prompt("Who is the Undercover", seat.style))
        .with_temperature(VOTE_TEMPERATURE)
        .with_max_tokens(VOTE_MAX_TOKENS)
}

/// Style prefix, a role-conditioned hint and a style suffix.
fn template_speech(seat: &UndercoverSeat<'_>, rng: &mut GameRng) -> String {
    let style = seat.style;
    let prefix = rng.pick(style.prefixes()).unwrap_or_default();
    let suffix = rng.pick(style.suffixes()).unwrap_or_default();

    let word = seat.me.word.as_str();
    let letters = word.chars().count();
    let mut body = match seat.me.role {
        _ if word.is_empty() => "my card is blank, so I'm listening for where everyone is heading".to_string(),
        UndercoverRole::Undercover => format!(
            "mine is {letters} letters and brings up a picture more than a feeling, let's keep it visual"
        ),
        _ => format!("mine is {letters} letters and feels pretty everyday, let's find common ground"),
    };
    if seat.round > 1 && !seat.speeches.is_empty() {
        body.push_str(", and I'm still thinking about last round");
    }
    format!("{prefix} {body}. {suffix}")
}

/// Latest named opponent, then a faction-biased pick, then uniform.
fn heuristic_vote(seat: &UndercoverSeat<'_>, eligible: &[PlayerId], rng: &mut GameRng) -> Option<PlayerId> {
    let me = seat.me.id;
    let others: Vec<PlayerId> = eligible.iter().copied().filter(|p| *p != me).collect();

    let names: Vec<(PlayerId, String)> = others
        .iter()
        .map(|id| (*id, seat.roster.display_name(*id)))
        .collect();
    let named: Vec<(PlayerId, &str)> = names.iter().map(|(id, n)| (*id, n.as_str())).collect();
    if let Some(target) = last_mentioned(seat.speeches, me, &named) {
        return Some(target);
    }

    let i_am_undercover = seat.me.role == UndercoverRole::Undercover;
    let opponents: Vec<PlayerId> = others
        .iter()
        .copied()
        .filter(|id| {
            seat.roster
                .role_of(*id)
                .is_ok_and(|r| (r == UndercoverRole::Undercover) != i_am_undercover)
        })
        .collect();
    if !opponents.is_empty() && rng.gen_bool(FACTION_BIAS) {
        return rng.pick(&opponents);
    }
    rng.pick(&others)
}
