//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use deduction_engine::core::ManualClock;
use deduction_engine::{
    AiStyle, Collaborators, EngineResult, GameEngine, GameEvent, Participant, PassthroughFilter,
    PlayerId, ProcessOutcome, StaticWordPool, WordPair,
};

pub fn humans(n: u64) -> Vec<Participant> {
    (1..=n).map(|i| Participant::human(i, format!("P{i}"))).collect()
}

pub fn bots(n: u64) -> Vec<Participant> {
    (1..=n)
        .map(|i| Participant::ai(i, format!("Bot{i}"), AiStyle::Balanced))
        .collect()
}

pub fn collaborators(clock: &Arc<ManualClock>) -> Collaborators {
    Collaborators::new(
        Arc::new(PassthroughFilter),
        Arc::new(StaticWordPool::new(vec![
            WordPair::new("apple", "pear").with_topic("food").with_difficulty("easy"),
        ])),
        clock.clone(),
    )
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at_epoch())
}

pub fn speech(actor: PlayerId, content: &str) -> GameEvent {
    GameEvent::new("submit_speech")
        .with_actor(actor)
        .with("content", content)
}

pub fn vote(actor: PlayerId, target: PlayerId) -> GameEvent {
    GameEvent::new("submit_vote")
        .with_actor(actor)
        .with("target_id", target.raw())
}

/// Every queued speaker says something, in turn order.
pub fn speak_all(game: &mut dyn GameEngine) -> EngineResult<Vec<ProcessOutcome>> {
    let mut outcomes = Vec::new();
    while let Some(speaker) = game.current_actor() {
        outcomes.push(game.process(&speech(speaker, &format!("hello from {speaker}")))?);
    }
    Ok(outcomes)
}
