//! Session lifecycle and persistence tests.
//!
//! Snapshots must capture everything, the RNG position included, so a
//! restored session continues exactly like the original.

mod common;

use std::sync::Arc;

use deduction_engine::core::{UndercoverConfig, WerewolfConfig};
use deduction_engine::{
    Clock, EngineError, EngineFactory, GameEngine, GameEvent, ManualClock, Phase, ProcessInput,
    RoomConfig, Session, SessionDirectory, SessionSnapshot, SessionStatus, Variant,
};

fn factory() -> (Arc<ManualClock>, EngineFactory) {
    let clock = common::clock();
    let factory = EngineFactory::new(common::collaborators(&clock));
    (clock, factory)
}

/// A binary snapshot restored mid-game plays out identically to the original.
#[test]
fn test_restored_session_replays_identically() {
    let (_clock, factory) = factory();
    let config = RoomConfig::Undercover(UndercoverConfig::default().untimed());
    let mut original = factory.start(config, &common::bots(5), 2024).unwrap();
    assert_eq!(original.drain_roster_updates().len(), 5);

    let bytes = original.snapshot().to_bytes().unwrap();
    let mut restored = factory.restore(SessionSnapshot::from_bytes(&bytes).unwrap());
    assert_eq!(restored.variant(), Variant::Undercover);
    assert_eq!(restored.snapshot(), original.snapshot());

    let ready = GameEvent::new("ready");
    let a = original.process(&ready).unwrap();
    let b = restored.process(&ready).unwrap();

    assert!(a.finished);
    assert_eq!(a, b);
    assert_eq!(original.snapshot(), restored.snapshot());
    assert_eq!(original.public_view(None), restored.public_view(None));
    assert_eq!(original.result(), restored.result());
}

/// JSON snapshots round-trip werewolf state, night ledger included.
#[test]
fn test_werewolf_snapshot_json_round_trip() {
    let (_clock, factory) = factory();
    let config = RoomConfig::Werewolf(WerewolfConfig::default().with_roles(2, 1, 1).untimed());
    let mut engine = factory.start(config, &common::humans(6), 8).unwrap();
    engine.drain_roster_updates();

    let snapshot = engine.snapshot();
    let json = snapshot.to_json().unwrap();
    let decoded = SessionSnapshot::from_json(&json).unwrap();
    assert_eq!(decoded, snapshot);
    assert_eq!(decoded.variant(), Variant::Werewolf);
    assert!(json.contains("night.wolves") || json.contains("night_wolves"));
}

/// A rejected event leaves the session exactly as it was.
#[test]
fn test_rejected_event_rolls_back() {
    let (_clock, factory) = factory();
    let config = RoomConfig::Undercover(UndercoverConfig::default().untimed());
    let engine = factory.start(config, &common::humans(4), 5).unwrap();
    let mut session = Session::new(1, 10, engine);

    session.process(&GameEvent::new("ready")).unwrap();
    let before = session.engine().snapshot();

    let speaker = session.engine().current_actor().unwrap();
    let err = session.process(&common::vote(speaker, speaker)).unwrap_err();
    assert!(matches!(err, EngineError::InvalidPhase { .. }));
    assert_eq!(session.engine().snapshot(), before);

    let err = session.process(&GameEvent::new("dance")).unwrap_err();
    assert_eq!(err, EngineError::UnknownEvent("dance".into()));
    assert_eq!(session.engine().snapshot(), before);
    assert!(session.is_active());
}

/// Persistable fields mirror the engine and decode back into a snapshot.
#[test]
fn test_persistable_fields() {
    let (clock, factory) = factory();
    let config = RoomConfig::Werewolf(WerewolfConfig::default().with_roles(1, 1, 1));
    let engine = factory.start(config, &common::humans(5), 3).unwrap();
    let session = Session::new(2, 20, engine);

    let fields = session.persistable().unwrap();
    assert_eq!(fields.phase, Phase::Night);
    assert_eq!(fields.stage.as_deref(), Some("night.wolves"));
    assert_eq!(fields.round, 1);
    assert_eq!(fields.current_actor, None);
    assert!(!fields.finished);
    assert_eq!(fields.deadline, Some(clock.now() + chrono::Duration::seconds(45)));
    assert_eq!(
        fields.timer.as_ref().map(|t| t.generation),
        Some(session.engine().phase_clock().generation())
    );
    assert_eq!(
        fields.snapshot().unwrap().to_json().unwrap(),
        session.engine().snapshot().to_json().unwrap()
    );

    let event = session.timeout_event().unwrap();
    assert_eq!(event.str_field("stage"), Some("night.wolves"));
    assert_eq!(event.str_field("phase"), Some("night"));
}

/// Loading a persisted session makes it routable again.
#[test]
fn test_directory_load_and_dispatch() {
    let (_clock, factory) = factory();
    let mut directory = SessionDirectory::new(factory.clone());
    let config = RoomConfig::Undercover(UndercoverConfig::default().untimed());
    let (id, _) = directory.start(1, config, &common::humans(4), 9).unwrap();

    let stored = directory.get(id).unwrap().persistable().unwrap();

    let mut reloaded = SessionDirectory::new(factory);
    let session = reloaded.load(id, 1, stored.snapshot().unwrap());
    assert_eq!(session.status(), SessionStatus::Active);
    assert_eq!(reloaded.active_in(1).map(Session::id), Some(id));

    reloaded.dispatch(id, &GameEvent::new("ready")).unwrap();
    assert_eq!(
        reloaded.get(id).unwrap().engine().phase_clock().phase(),
        Phase::Speaking
    );

    let (next, _) = reloaded
        .start(2, RoomConfig::default_for(Variant::Werewolf), &common::humans(6), 1)
        .unwrap();
    assert!(next > id);
}

/// Finishing a game through dispatch frees the room.
#[test]
fn test_finished_session_leaves_room() {
    let (_clock, factory) = factory();
    let mut directory = SessionDirectory::new(factory);
    let config = RoomConfig::Undercover(UndercoverConfig::default().untimed());
    let (id, _) = directory.start(5, config, &common::humans(3), 4).unwrap();

    let outcome = directory.dispatch(id, &GameEvent::new("force_result")).unwrap();
    assert!(outcome.finished);
    assert!(directory.active_in(5).is_none());
    assert_eq!(directory.get(id).map(Session::status), Some(SessionStatus::Completed));
    assert!(matches!(
        directory.dispatch(id, &GameEvent::new("ready")),
        Err(EngineError::InvalidPhase { .. })
    ));
}

/// Restoring a snapshot of the other variant is refused.
#[test]
fn test_restore_rejects_other_variant() {
    let (_clock, factory) = factory();
    let mut undercover = factory
        .start(RoomConfig::Undercover(UndercoverConfig::default()), &common::humans(4), 1)
        .unwrap();
    let werewolf = factory
        .start(RoomConfig::Werewolf(WerewolfConfig::default()), &common::humans(4), 1)
        .unwrap();

    let before = undercover.snapshot();
    assert!(matches!(
        undercover.restore(werewolf.snapshot()),
        Err(EngineError::Configuration(_))
    ));
    assert_eq!(undercover.snapshot(), before);
}

/// Loading a snapshot into a room under a new id completes the session
/// already active there.
#[test]
fn test_load_keeps_one_active_session_per_room() {
    let (_clock, factory) = factory();
    let mut directory = SessionDirectory::new(factory);
    let config = RoomConfig::Undercover(UndercoverConfig::default().untimed());
    let (first, _) = directory.start(7, config, &common::humans(4), 3).unwrap();
    let snapshot = directory.get(first).unwrap().engine().snapshot();

    let loaded = directory.load(99, 7, snapshot).id();
    assert_eq!(loaded, 99);
    assert_eq!(directory.active_in(7).map(Session::id), Some(99));
    assert_eq!(directory.get(first).map(Session::status), Some(SessionStatus::Completed));

    let active = [first, 99]
        .into_iter()
        .filter(|id| directory.get(*id).is_some_and(Session::is_active))
        .count();
    assert_eq!(active, 1);
    assert!(matches!(
        directory.dispatch(first, &GameEvent::new("ready")),
        Err(EngineError::InvalidPhase { .. })
    ));
    directory.dispatch(99, &GameEvent::new("ready")).unwrap();
}

/// Reloading a session under its own id does not complete it.
#[test]
fn test_reload_same_id_stays_active() {
    let (_clock, factory) = factory();
    let mut directory = SessionDirectory::new(factory);
    let config = RoomConfig::Undercover(UndercoverConfig::default().untimed());
    let (id, _) = directory.start(4, config, &common::humans(4), 6).unwrap();
    let snapshot = directory.get(id).unwrap().engine().snapshot();

    directory.load(id, 4, snapshot);
    assert_eq!(directory.len(), 1);
    assert_eq!(directory.active_in(4).map(Session::id), Some(id));
    assert!(directory.get(id).unwrap().is_active());
}

/// Artificial players can be run on their own through the guarded path;
/// with no artificial players nothing changes.
#[test]
fn test_auto_actions_without_bots_change_nothing() {
    let (_clock, factory) = factory();
    let config = RoomConfig::Undercover(UndercoverConfig::default().untimed());
    let mut engine = factory.start(config, &common::humans(4), 2).unwrap();
    engine.drain_roster_updates();
    let before = engine.snapshot();

    let outcome = engine.process_with(ProcessInput::AutoActions).unwrap();
    assert!(!outcome.auto_progress);
    assert!(outcome.events.is_empty());
    assert!(!outcome.finished);
    assert_eq!(engine.snapshot(), before);
}
