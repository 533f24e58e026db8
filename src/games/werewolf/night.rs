//! Night actions: wolves, then seer, then witch, then resolution.
//!
//! A stage whose role holder is dead is skipped. Deaths are applied only
//! when the night resolves, so the witch sees the pending kill.

use smallvec::SmallVec;
use tracing::{debug, info};

use super::game::WerewolfGame;
use super::state::{check_winner, LastResult, SeerCheck, Stage};
use crate::core::{EngineError, EngineResult, PlayerId, RosterUpdate};
use crate::cycle::Origin;

impl WerewolfGame {
    pub(super) fn submit_wolf_target(
        &mut self,
        actor: Option<PlayerId>,
        target: Option<PlayerId>,
        origin: Origin,
    ) -> EngineResult<()> {
        self.ensure_stage(Stage::NightWolves)?;
        let wolves = self.state.alive_wolves();
        if origin == Origin::Human && !actor.is_some_and(|a| wolves.contains(&a)) {
            return Err(EngineError::InvalidTurn(
                "only a living werewolf may choose the target".into(),
            ));
        }
        let target = target.ok_or_else(|| EngineError::InvalidTarget("missing target_id".into()))?;
        if !self.state.roster.is_alive(target) {
            return Err(EngineError::InvalidTarget(format!("{target} is not alive")));
        }
        if wolves.contains(&target) {
            return Err(EngineError::InvalidTarget(
                "werewolves cannot target each other".into(),
            ));
        }

        self.state.night.wolves_target = Some(target);
        debug!(target = %target, round = self.state.round, "wolves chose a target");
        self.after_wolves()
    }

    pub(super) fn after_wolves(&mut self) -> EngineResult<()> {
        if self.state.alive_seer().is_some() {
            self.set_stage(Stage::NightSeer);
            Ok(())
        } else {
            self.after_seer()
        }
    }

    pub(super) fn submit_seer_target(
        &mut self,
        actor: Option<PlayerId>,
        target: Option<PlayerId>,
        origin: Origin,
    ) -> EngineResult<()> {
        self.ensure_stage(Stage::NightSeer)?;
        let Some(seer) = self.state.alive_seer() else {
            return self.after_seer();
        };
        if origin == Origin::Human && actor != Some(seer) {
            return Err(EngineError::InvalidTurn("only the seer may check a player".into()));
        }
        let target = target.ok_or_else(|| EngineError::InvalidTarget("missing target_id".into()))?;
        if target == seer {
            return Err(EngineError::InvalidTarget("the seer cannot check themselves".into()));
        }
        if !self.state.roster.is_alive(target) {
            return Err(EngineError::InvalidTarget(format!("{target} is not alive")));
        }

        let check = SeerCheck {
            target,
            role: self.state.roster.role_of(target)?,
            round: self.state.round,
            at: self.now(),
        };
        self.state.seer_history.push(check.clone());
        self.state.night.seer_result = Some(check);
        self.state.clock.push_roster_update(RosterUpdate::SkillUsed {
            player: seer,
            skill: "seer_check".into(),
        });
        debug!(target = %target, "seer checked a player");
        self.after_seer()
    }

    pub(super) fn after_seer(&mut self) -> EngineResult<()> {
        if self.state.alive_witch().is_some() {
            self.set_stage(Stage::NightWitch);
            Ok(())
        } else {
            self.resolve_night()
        }
    }

    /// Validate every part of the witch's choice before spending anything.
    pub(super) fn submit_witch_action(
        &mut self,
        actor: Option<PlayerId>,
        use_antidote: bool,
        use_poison: bool,
        target: Option<PlayerId>,
        origin: Origin,
    ) -> EngineResult<()> {
        self.ensure_stage(Stage::NightWitch)?;
        let Some(witch) = self.state.alive_witch() else {
            return self.resolve_night();
        };
        if origin == Origin::Human && actor != Some(witch) {
            return Err(EngineError::InvalidTurn("only the witch may use potions".into()));
        }
        if self.state.night.witch_acted {
            return Err(EngineError::InvalidTurn("the witch already acted tonight".into()));
        }
        let potions = self.state.potions;
        if use_antidote && use_poison && !potions.allow_double {
            return Err(EngineError::ResourceExhausted(
                "only one potion may be used per night".into(),
            ));
        }

        let pending = self.state.night.wolves_target;
        if use_antidote {
            if !potions.antidote {
                return Err(EngineError::ResourceExhausted("antidote already used".into()));
            }
            if pending.is_none() {
                return Err(EngineError::InvalidTarget("nobody to save tonight".into()));
            }
        }
        let poisoned = if use_poison {
            if !potions.poison {
                return Err(EngineError::ResourceExhausted("poison already used".into()));
            }
            let target =
                target.ok_or_else(|| EngineError::InvalidTarget("poison needs a target_id".into()))?;
            if target == witch {
                return Err(EngineError::InvalidTarget("the witch cannot poison themselves".into()));
            }
            if !self.state.roster.is_alive(target) {
                return Err(EngineError::InvalidTarget(format!("{target} is not alive")));
            }
            if Some(target) == pending {
                return Err(EngineError::InvalidTarget(
                    "cannot poison the player already attacked tonight".into(),
                ));
            }
            Some(target)
        } else {
            None
        };

        self.state.night.witch_acted = true;
        if use_antidote {
            self.state.potions.antidote = false;
            self.state.night.witch_saved = true;
        }
        if let Some(target) = poisoned {
            self.state.potions.poison = false;
            self.state.night.witch_poison = Some(target);
        }
        if use_antidote || poisoned.is_some() {
            self.state.clock.push_roster_update(RosterUpdate::SkillUsed {
                player: witch,
                skill: "witch_potion".into(),
            });
        }
        debug!(saved = use_antidote, poisoned = ?poisoned, "witch acted");
        self.resolve_night()
    }

    /// Apply the night's deaths, then start the day or end the game.
    pub(super) fn resolve_night(&mut self) -> EngineResult<()> {
        let night = std::mem::take(&mut self.state.night);
        let mut killed: SmallVec<[PlayerId; 2]> = SmallVec::new();
        let mut saved = None;

        if let Some(target) = night.wolves_target {
            if night.witch_saved {
                saved = Some(target);
            } else {
                killed.push(target);
            }
        }
        if let Some(target) = night.witch_poison {
            if !killed.contains(&target) {
                killed.push(target);
            }
        }

        for &victim in &killed {
            if self.state.roster.eliminate(victim, true)? {
                self.state
                    .clock
                    .push_roster_update(RosterUpdate::Eliminated { player: victim });
            }
        }
        info!(round = self.state.round, killed = ?killed, saved = ?saved, "night resolved");

        self.state.last_result = LastResult {
            night_killed: killed,
            saved,
            lynched: None,
        };

        match check_winner(&self.state.roster) {
            Some(winner) => self.finish(Some(winner)),
            None => self.enter_day(),
        }
        Ok(())
    }
}
