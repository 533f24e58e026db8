//! Word-guess variant flow tests.
//!
//! These drive a full game through the public `GameEngine` surface: deal,
//! speaking passes, votes and revotes, countdown expiry, and what each
//! viewer is allowed to see.

mod common;

use std::sync::Arc;

use deduction_engine::core::{UndercoverConfig, UndercoverTimers};
use deduction_engine::cycle::TIMEOUT_SPEECH;
use deduction_engine::games::undercover::{UndercoverRole, UndercoverWinner};
use deduction_engine::rules::VariantDetail;
use deduction_engine::{
    BannedWordFilter, EngineError, GameEngine, GameEvent, Phase, PlayerId, Session, UndercoverGame,
};

fn untimed() -> UndercoverConfig {
    UndercoverConfig::default().with_undercover(1).with_blanks(0).untimed()
}

fn start(config: UndercoverConfig, players: u64, seed: u64) -> UndercoverGame {
    let clock = common::clock();
    UndercoverGame::start(config, &common::humans(players), common::collaborators(&clock), seed)
        .unwrap()
}

fn undercover_of(game: &UndercoverGame) -> PlayerId {
    game.state().roster.with_role(UndercoverRole::Undercover)[0]
}

/// Civilians find the undercover on the first vote and win.
#[test]
fn test_civilians_win_first_round() {
    let mut game = start(untimed(), 4, 7);
    assert_eq!(game.phase_clock().phase(), Phase::Preparing);

    game.process(&GameEvent::new("ready")).unwrap();
    assert_eq!(game.phase_clock().phase(), Phase::Speaking);

    common::speak_all(&mut game).unwrap();
    assert_eq!(game.phase_clock().phase(), Phase::Voting);
    assert_eq!(game.state().speech.speeches().len(), 4);

    let undercover = undercover_of(&game);
    let civilians: Vec<PlayerId> = game
        .state()
        .roster
        .ids()
        .into_iter()
        .filter(|p| *p != undercover)
        .collect();

    game.process(&common::vote(undercover, civilians[0])).unwrap();
    let mut last = None;
    for civilian in &civilians {
        last = Some(game.process(&common::vote(*civilian, undercover)).unwrap());
    }

    assert!(last.unwrap().finished);
    assert_eq!(game.phase_clock().phase(), Phase::Result);
    assert_eq!(game.state().winner, Some(UndercoverWinner::Civilian));

    let result = game.result().unwrap();
    assert_eq!(result.faction, "civilian");
    assert_eq!(result.winners.len(), 3);
    assert!(!result.is_winner(undercover));

    let view = game.public_view(None);
    assert_eq!(view.winner.as_deref(), Some("civilian"));
    for player in &view.players {
        assert!(player.role.is_some());
        assert!(player.word.is_some());
    }
    assert_eq!(view.player(undercover).unwrap().role.as_deref(), Some("undercover"));
    assert_eq!(view.player(undercover).unwrap().word.as_deref(), Some("pear"));
    match view.detail {
        VariantDetail::Undercover(detail) => {
            assert_eq!(detail.word_pair.unwrap().civilian_word, "apple");
        }
        VariantDetail::Werewolf(_) => panic!("wrong variant detail"),
    }
}

/// A tie between two of four players opens a revote among the tied pair.
#[test]
fn test_partial_tie_opens_revote() {
    let mut game = start(untimed(), 4, 11);
    game.process(&GameEvent::new("ready")).unwrap();
    common::speak_all(&mut game).unwrap();

    let ids = game.state().roster.ids();
    let (a, b) = (ids[0], ids[2]);
    game.process(&common::vote(ids[0], b)).unwrap();
    game.process(&common::vote(ids[1], b)).unwrap();
    game.process(&common::vote(ids[2], a)).unwrap();
    game.process(&common::vote(ids[3], a)).unwrap();

    assert_eq!(game.phase_clock().phase(), Phase::Voting);
    assert_eq!(game.state().votes.vote_round(), 2);
    assert_eq!(game.state().roster.alive_ids().len(), 4);

    let view = game.public_view(Some(ids[1]));
    let mut eligible = view.eligible_targets.clone();
    eligible.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(eligible, expected);
    assert_eq!(view.vote_round, 2);
    assert_eq!(view.vote_summary.submitted, 0);

    let outside = ids[1];
    assert!(matches!(
        game.process(&common::vote(ids[0], outside)),
        Err(EngineError::InvalidTarget(_))
    ));
}

/// Speaking out of turn or twice is rejected without changing state.
#[test]
fn test_speech_turn_enforced() {
    let mut game = start(untimed(), 4, 3);
    game.process(&GameEvent::new("ready")).unwrap();

    let current = game.current_actor().unwrap();
    let other = game
        .state()
        .roster
        .ids()
        .into_iter()
        .find(|p| *p != current)
        .unwrap();

    let before = game.state().clone();
    assert!(matches!(
        game.process(&common::speech(other, "not my turn")),
        Err(EngineError::InvalidTurn(_))
    ));
    assert_eq!(game.state(), &before);

    assert!(matches!(
        game.process(&common::speech(current, "   ")),
        Err(EngineError::ContentPolicyViolation(_))
    ));
    assert_eq!(game.state(), &before);

    assert!(matches!(
        game.process(&common::vote(current, other)),
        Err(EngineError::InvalidPhase { .. })
    ));
}

/// Human speeches with banned terms are rejected.
#[test]
fn test_banned_human_speech_rejected() {
    let clock = common::clock();
    let collaborators = common::collaborators(&clock)
        .with_content_filter(Arc::new(BannedWordFilter::new(["cheat"])));
    let mut game = UndercoverGame::start(untimed(), &common::humans(4), collaborators, 5).unwrap();
    game.process(&GameEvent::new("ready")).unwrap();

    let speaker = game.current_actor().unwrap();
    assert!(matches!(
        game.process(&common::speech(speaker, "I never cheat")),
        Err(EngineError::ContentPolicyViolation(_))
    ));
    assert_eq!(game.current_actor(), Some(speaker));
    assert!(game.state().speech.speeches().is_empty());
}

/// A player sees their own word but not their own role; spectators see neither.
#[test]
fn test_hidden_information_before_result() {
    let mut game = start(untimed(), 5, 21);
    game.process(&GameEvent::new("ready")).unwrap();

    let undercover = undercover_of(&game);
    let civilian = game
        .state()
        .roster
        .ids()
        .into_iter()
        .find(|p| *p != undercover)
        .unwrap();

    let own = game.public_view(Some(undercover));
    let me = own.player(undercover).unwrap();
    assert_eq!(me.word.as_deref(), Some("pear"));
    assert!(me.role.is_none());
    assert!(own.player(civilian).unwrap().word.is_none());
    match &own.detail {
        VariantDetail::Undercover(detail) => {
            assert_eq!(detail.self_word.as_deref(), Some("pear"));
            assert!(detail.word_pair.is_none());
            assert_eq!(detail.topic.as_deref(), Some("food"));
        }
        VariantDetail::Werewolf(_) => panic!("wrong variant detail"),
    }

    let spectator = game.public_view(None);
    assert!(spectator.players.iter().all(|p| p.role.is_none() && p.word.is_none()));
    assert_eq!(spectator.current_player, game.current_actor());
}

/// Eliminated players stay unrevealed until the game ends.
#[test]
fn test_elimination_keeps_role_hidden() {
    let mut game = start(untimed(), 5, 8);
    game.process(&GameEvent::new("ready")).unwrap();
    common::speak_all(&mut game).unwrap();

    let undercover = undercover_of(&game);
    let ids = game.state().roster.ids();
    let victim = ids.iter().copied().find(|p| *p != undercover).unwrap();
    for voter in &ids {
        let target = if *voter == victim { undercover } else { victim };
        game.process(&common::vote(*voter, target)).unwrap();
    }

    assert_eq!(game.phase_clock().phase(), Phase::Speaking);
    assert_eq!(game.round(), 2);
    assert!(!game.state().roster.is_alive(victim));
    assert!(game.state().speech.speeches().is_empty());

    let view = game.public_view(None);
    let entry = view.player(victim).unwrap();
    assert!(!entry.alive);
    assert!(entry.role.is_none());
    assert!(!game.state().speech.remaining().contains(&victim));
}

/// Countdown expiry starts the game, speaks for the idle speaker, and votes for idle voters.
#[test]
fn test_timeouts_drive_the_game() {
    let clock = common::clock();
    let config = UndercoverConfig::default().with_timers(UndercoverTimers {
        preparing: 30,
        speaking: 60,
        voting: 45,
    });
    let game = UndercoverGame::start(config, &common::humans(4), common::collaborators(&clock), 13)
        .unwrap();
    let mut session = Session::new(1, 1, Box::new(game));

    let early = session.timeout_event().unwrap();
    session.process(&early).unwrap();
    assert_eq!(session.engine().phase_clock().phase(), Phase::Preparing);

    clock.advance_secs(30);
    session.process(&early).unwrap();
    assert_eq!(session.engine().phase_clock().phase(), Phase::Speaking);

    let speaker = session.engine().current_actor().unwrap();
    clock.advance_secs(60);
    let expire_speech = session.timeout_event().unwrap();
    session.process(&expire_speech).unwrap();

    let speeches = &session.view(None).speeches;
    assert_eq!(speeches.len(), 1);
    assert_eq!(speeches[0].player, speaker);
    assert!(!speeches[0].is_ai);
    assert_eq!(speeches[0].content, TIMEOUT_SPEECH);
    assert_ne!(session.engine().current_actor(), Some(speaker));

    // Re-delivering the same timeout after the speaker changed is a no-op.
    clock.advance_secs(120);
    session.process(&expire_speech).unwrap();
    assert_eq!(session.view(None).speeches.len(), 1);

    while session.engine().phase_clock().phase() == Phase::Speaking {
        let current = session.engine().current_actor().unwrap();
        session.process(&common::speech(current, "it is round")).unwrap();
    }
    assert_eq!(session.engine().phase_clock().phase(), Phase::Voting);

    clock.advance_secs(45);
    let expire_vote = session.timeout_event().unwrap();
    session.process(&expire_vote).unwrap();

    let phase = session.engine().phase_clock().phase();
    assert!(session.view(None).vote_summary.submitted == 0 || session.result().is_some());
    assert!(phase == Phase::Speaking || phase == Phase::Voting || phase == Phase::Result);
    let persisted = session.persistable().unwrap();
    assert_eq!(persisted.phase, phase);
}

/// A bare timeout without a stamp still waits for the deadline.
#[test]
fn test_bare_timeout_respects_deadline() {
    let clock = common::clock();
    let config = UndercoverConfig::default();
    let mut game =
        UndercoverGame::start(config, &common::humans(3), common::collaborators(&clock), 2).unwrap();

    game.process(&GameEvent::timeout()).unwrap();
    assert_eq!(game.phase_clock().phase(), Phase::Preparing);
    assert!(game.state().timeouts.is_empty());

    clock.advance_secs(31);
    game.process(&GameEvent::timeout()).unwrap();
    assert_eq!(game.phase_clock().phase(), Phase::Speaking);
    assert_eq!(game.state().timeouts.len(), 1);
}

/// The host can end the game early without a winner.
#[test]
fn test_force_result() {
    let mut game = start(untimed(), 3, 1);
    let outcome = game.process(&GameEvent::new("force_result")).unwrap();
    assert!(outcome.finished);
    assert!(game.result().is_none());
    assert!(game
        .public_view(None)
        .players
        .iter()
        .all(|p| p.role.is_some()));
}
