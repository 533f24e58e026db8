//! Decisions for the night/day variant.
//!
//! Day speech and votes may use the model. Night actions are heuristic only.
//! Heuristics use only what the player's role legitimately knows: wolves
//! know their allies, the seer knows their checks.

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
use crate::games::werewolf::{LastResult, Potions, SeerCheck, WerewolfRole};
use crate::ports::{GenerationRequest, TextGenerator};

/// Chance the witch saves tonight's victim when she can.
const SAVE_CHANCE: f64 = 0.8;
/// Chance the witch spends her poison on a given night.
const POISON_CHANCE: f64 = 0.15;

/// What an artificial player knows when it must act.
#[derive(Clone, Copy, Debug)]
pub struct WerewolfSeat<'a> {
    pub me: &'a PlayerAssignment<WerewolfRole>,
    pub style: AiStyle,
    pub roster: &'a Roster<WerewolfRole>,
    pub round: u32,
    pub speeches: &'a [Speech],
    pub last_result: &'a LastResult,
    pub seer_history: &'a [SeerCheck],
}

impl WerewolfSeat<'_> {
    fn alive_others(&self) -> Vec<PlayerId> {
        self.roster
            .alive_ids()
            .into_iter()
            .filter(|p| *p != self.me.id)
            .collect()
    }

    fn is_ally(&self, id: PlayerId) -> bool {
        self.me.role.is_wolf() && self.roster.role_of(id).is_ok_and(WerewolfRole::is_wolf)
    }

    /// Checks the viewer made, when the viewer is the seer.
    fn my_checks(&self) -> &[SeerCheck] {
        if self.me.role == WerewolfRole::Seer {
            self.seer_history
        } else {
            &[]
        }
    }

    fn known_wolves(&self) -> Vec<PlayerId> {
        self.my_checks()
            .iter()
            .filter(|c| c.role.is_wolf() && self.roster.is_alive(c.target))
            .map(|c| c.target)
            .collect()
    }
}

/// What the witch can do tonight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WitchContext {
    pub pending_kill: Option<PlayerId>,
    pub potions: Potions,
}

/// The witch's choice. Legality is checked by the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WitchDecision {
    pub use_antidote: bool,
    pub poison: Option<PlayerId>,
}

/// One per session; shared by every artificial player in it.
#[derive(Clone, Debug, Default)]
pub struct WerewolfStrategy {
    model: ModelBackend,
}

impl WerewolfStrategy {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self {
            model: ModelBackend::new(generator),
        }
    }

    pub fn speak(&self, seat: &WerewolfSeat<'_>, rng: &mut GameRng) -> String {
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

    pub fn vote(&self, seat: &WerewolfSeat<'_>, eligible: &[PlayerId], rng: &mut GameRng) -> Decision {
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

    /// Night victim for the wolf pack.
    pub fn wolf_target(&self, seat: &WerewolfSeat<'_>, rng: &mut GameRng) -> Option<PlayerId> {
        let started = Instant::now();
        let prey: Vec<PlayerId> = seat
            .alive_others()
            .into_iter()
            .filter(|p| !seat.is_ally(*p))
            .collect();

        // Whoever last named a wolf is the loudest threat.
        let accuser = seat.speeches.iter().rev().find_map(|speech| {
            let content = speech.content.to_lowercase();
            let names_a_wolf = seat
                .roster
                .iter()
                .filter(|p| p.role.is_wolf() && p.id != speech.player)
                .any(|p| content.contains(&p.display_name.to_lowercase()));
            (names_a_wolf && prey.contains(&speech.player)).then_some(speech.player)
        });
        let target = accuser.or_else(|| rng.pick(&prey));
        record_decision(DecisionKind::Night, DecisionSource::Heuristic, started.elapsed());
        target
    }

    /// Player to check tonight, avoiding repeats.
    pub fn seer_target(&self, seat: &WerewolfSeat<'_>, rng: &mut GameRng) -> Option<PlayerId> {
        let started = Instant::now();
        let others = seat.alive_others();
        let unchecked: Vec<PlayerId> = others
            .iter()
            .copied()
            .filter(|p| !seat.my_checks().iter().any(|c| c.target == *p))
            .collect();
        let target = rng.pick(&unchecked).or_else(|| rng.pick(&others));
        record_decision(DecisionKind::Night, DecisionSource::Heuristic, started.elapsed());
        target
    }

    pub fn witch_action(
        &self,
        seat: &WerewolfSeat<'_>,
        context: &WitchContext,
        rng: &mut GameRng,
    ) -> WitchDecision {
        let started = Instant::now();
        let potions = context.potions;
        let use_antidote = potions.antidote
            && context
                .pending_kill
                .is_some_and(|victim| victim == seat.me.id || rng.gen_bool(SAVE_CHANCE));

        let poison = if potions.poison && (!use_antidote || potions.allow_double) && rng.gen_bool(POISON_CHANCE) {
            let candidates: Vec<PlayerId> = seat
                .alive_others()
                .into_iter()
                .filter(|p| Some(*p) != context.pending_kill)
                .collect();
            rng.pick(&candidates)
        } else {
            None
        };
        record_decision(DecisionKind::Night, DecisionSource::Heuristic, started.elapsed());
        WitchDecision { use_antidote, poison }
    }
}

fn role_line(seat: &WerewolfSeat<'_>) -> String {
    let mut line = format!("Your secret role is {}.", seat.me.role.as_str());
    match seat.me.role {
        WerewolfRole::Werewolf => {
            let allies: Vec<String> = seat
                .roster
                .iter()
                .filter(|p| p.role.is_wolf() && p.id != seat.me.id)
                .map(|p| p.display_name.clone())
                .collect();
            if !allies.is_empty() {
                line.push_str(&format!(" Your fellow wolves: {}.", allies.join(", ")));
            }
            line.push_str(" Pretend to be a villager.");
        }
        WerewolfRole::Seer => {
            for check in seat.my_checks() {
                line.push_str(&format!(
                    " You checked {}: {}.",
                    seat.roster.display_name(check.target),
                    if check.role.is_wolf() { "werewolf" } else { "not a werewolf" }
                ));
            }
        }
        _ => {}
    }
    line
}

fn night_line(seat: &WerewolfSeat<'_>) -> String {
    if seat.last_result.night_killed.is_empty() {
        "Nobody died last night.".to_string()
    } else {
        let names: Vec<String> = seat
            .last_result
            .night_killed
            .iter()
            .map(|id| seat.roster.display_name(*id))
            .collect();
        format!("Died last night: {}.", names.join(", "))
    }
}

fn speech_request(seat: &WerewolfSeat<'_>) -> GenerationRequest {
    let prompt = format!(
        "{}\nDay {}. {}\nRecent speeches:\n{}\
         Say one or two short first-person sentences for the day discussion.",
        role_line(seat),
        seat.round,
        night_line(seat),
        format_history(seat.speeches, seat.roster),
    );
    GenerationRequest::new(prompt)
        .with_system_prompt(system_prompt("Werewolf", seat.style))
        .with_max_tokens(SPEECH_MAX_TOKENS)
}

fn vote_request(seat: &WerewolfSeat<'_>, eligible: &[PlayerId]) -> GenerationRequest {
    let candidates: Vec<PlayerId> = eligible.iter().copied().filter(|p| *p != seat.me.id).collect();
    let prompt = format!(
        "{}\nDay {}. {}\nRecent speeches:\n{}Players you may vote out:\n{}\
         Vote to help your side win. {DECISION_FORMAT}",
        role_line(seat),
        seat.round,
        night_line(seat),
        format_history(seat.speeches, seat.roster),
        format_candidates(&candidates, seat.roster),
    );
    GenerationRequest::new(prompt)
        .with_system_prompt(system_prompt("Werewolf", seat.style))
        .with_temperature(VOTE_TEMPERATURE)
        .with_max_tokens(VOTE_MAX_TOKENS)
}

fn template_speech(seat: &WerewolfSeat<'_>, rng: &mut GameRng) -> String {
    let prefix = rng.pick(seat.style.prefixes()).unwrap_or_default();
    let suffix = rng.pick(seat.style.suffixes()).unwrap_or_default();

    let suspect = seat.known_wolves().first().map(|id| seat.roster.display_name(*id));
    let body = match suspect {
        Some(name) => format!("I have a strong feeling {name} is not on our side"),
        None if seat.last_result.night_killed.is_empty() && seat.round > 1 => {
            "a quiet night, so someone got lucky or someone was protected".to_string()
        }
        None if seat.last_result.night_killed.is_empty() => {
            "it's early, let's hear everyone before pointing fingers".to_string()
        }
        None => "we lost someone last night, let's think about who gains from that".to_string(),
    };
    format!("{prefix} {body}. {suffix}")
}

fn heuristic_vote(seat: &WerewolfSeat<'_>, eligible: &[PlayerId], rng: &mut GameRng) -> Option<PlayerId> {
    let me = seat.me.id;
    let others: Vec<PlayerId> = eligible
        .iter()
        .copied()
        .filter(|p| *p != me && !seat.is_ally(*p))
        .collect();
    let others: Vec<PlayerId> = if others.is_empty() {
        eligible.iter().copied().filter(|p| *p != me).collect()
    } else {
        others
    };

    if let Some(wolf) = seat.known_wolves().into_iter().find(|w| others.contains(w)) {
        return Some(wolf);
    }

    let names: Vec<(PlayerId, String)> = others
        .iter()
        .map(|id| (*id, seat.roster.display_name(*id)))
        .collect();
    let named: Vec<(PlayerId, &str)> = names.iter().map(|(id, n)| (*id, n.as_str())).collect();
    if let Some(target) = last_mentioned(seat.speeches, me, &named) {
        return Some(target);
    }

    let cleared: Vec<PlayerId> = seat
        .my_checks()
        .iter()
        .filter(|c| !c.role.is_wolf())
        .map(|c| c.target)
        .collect();
    let unsure: Vec<PlayerId> = others.iter().copied().filter(|p| !cleared.contains(p)).collect();
    rng.pick(&unsure).or_else(|| rng.pick(&others))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Participant;
    use chrono::{DateTime, Utc};

    fn roster() -> Roster<WerewolfRole> {
        use WerewolfRole::*;
        let seats = [(1, "Ash", Werewolf), (2, "Bo", Werewolf), (3, "Cy", Seer), (4, "Di", Witch), (5, "Ed", Villager)];
        Roster::new(
            seats
                .iter()
                .map(|&(id, name, role)| PlayerAssignment::new(&Participant::ai(id, name, AiStyle::Balanced), role, ""))
                .collect(),
        )
        .unwrap()
    }

    fn seat<'a>(
        roster: &'a Roster<WerewolfRole>,
        me: u64,
        last_result: &'a LastResult,
        checks: &'a [SeerCheck],
    ) -> WerewolfSeat<'a> {
        WerewolfSeat {
            me: roster.get(PlayerId(me)).unwrap(),
            style: AiStyle::Balanced,
            roster,
            round: 1,
            speeches: &[],
            last_result,
            seer_history: checks,
        }
    }

    #[test]
    fn test_wolf_never_targets_ally() {
        let roster = roster();
        let last = LastResult::default();
        let strategy = WerewolfStrategy::default();
        for seed in 0..32 {
            let mut rng = GameRng::new(seed);
            let target = strategy.wolf_target(&seat(&roster, 1, &last, &[]), &mut rng).unwrap();
            assert!(![PlayerId(1), PlayerId(2)].contains(&target));

            let eligible = roster.alive_ids();
            let vote = strategy.vote(&seat(&roster, 1, &last, &[]), &eligible, &mut rng);
            assert!(![Some(PlayerId(1)), Some(PlayerId(2))].contains(&vote.target));
        }
    }

    #[test]
    fn test_seer_avoids_repeat_checks() {
        let roster = roster();
        let last = LastResult::default();
        let checks: Vec<SeerCheck> = [1, 2, 4]
            .iter()
            .map(|&id| SeerCheck {
                target: PlayerId(id),
                role: roster.role_of(PlayerId(id)).unwrap(),
                round: 1,
                at: DateTime::<Utc>::default(),
            })
            .collect();
        let mut rng = GameRng::new(8);
        let target = WerewolfStrategy::default().seer_target(&seat(&roster, 3, &last, &checks), &mut rng);
        assert_eq!(target, Some(PlayerId(5)));
    }

    #[test]
    fn test_seer_votes_known_wolf() {
        let roster = roster();
        let last = LastResult::default();
        let checks = vec![SeerCheck {
            target: PlayerId(2),
            role: WerewolfRole::Werewolf,
            round: 1,
            at: DateTime::<Utc>::default(),
        }];
        let mut rng = GameRng::new(8);
        let decision = WerewolfStrategy::default().vote(&seat(&roster, 3, &last, &checks), &roster.alive_ids(), &mut rng);
        assert_eq!(decision.target, Some(PlayerId(2)));

        // Another player's seat never sees those checks.
        let villager = seat(&roster, 5, &last, &checks);
        assert!(villager.known_wolves().is_empty());
    }

    #[test]
    fn test_witch_respects_potions() {
        let roster = roster();
        let last = LastResult::default();
        let context = WitchContext {
            pending_kill: Some(PlayerId(4)),
            potions: Potions {
                antidote: true,
                poison: false,
                allow_double: false,
            },
        };
        let mut rng = GameRng::new(2);
        let decision = WerewolfStrategy::default().witch_action(&seat(&roster, 4, &last, &[]), &context, &mut rng);
        assert!(decision.use_antidote);
        assert_eq!(decision.poison, None);

        let empty = WitchContext {
            pending_kill: Some(PlayerId(5)),
            potions: Potions {
                antidote: false,
                poison: false,
                allow_double: false,
            },
        };
        let decision = WerewolfStrategy::default().witch_action(&seat(&roster, 4, &last, &[]), &empty, &mut rng);
        assert_eq!(decision, WitchDecision::default());
    }
}
