//! Sessions and the per-room directory.
//!
//! A [`Session`] wraps one engine and tracks whether it is still active.
//! [`SessionDirectory`] keeps at most one active session per room; starting
//! a new game in a room completes the previous one. Completed sessions are
//! kept for viewing but reject further events until the host evicts them
//! with [`SessionDirectory::evict_completed`].
//!
//! The directory does no locking. Hosts serialize access per session.

use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::{EngineError, EngineResult, GameEvent, Participant, PlayerId, RoomConfig};
use crate::rules::{
    EngineFactory, GameEngine, GameResult, PersistableFields, ProcessInput, ProcessOutcome,
    PublicView, SessionSnapshot, SnapshotError, Variant,
};

pub type SessionId = u64;
pub type RoomId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
}

/// One game in one room.
pub struct Session {
    id: SessionId,
    room_id: RoomId,
    status: SessionStatus,
    engine: Box<dyn GameEngine>,
}

impl Session {
    pub fn new(id: SessionId, room_id: RoomId, engine: Box<dyn GameEngine>) -> Self {
        let status = if engine.is_finished() {
            SessionStatus::Completed
        } else {
            SessionStatus::Active
        };
        Self {
            id,
            room_id,
            status,
            engine,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    #[must_use]
    pub fn variant(&self) -> Variant {
        self.engine.variant()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    #[must_use]
    pub fn engine(&self) -> &dyn GameEngine {
        self.engine.as_ref()
    }

    /// Apply one event atomically and let artificial players respond.
    pub fn process(&mut self, event: &GameEvent) -> EngineResult<ProcessOutcome> {
        self.apply(ProcessInput::Event(event))
    }

    /// Let artificial players act without an inbound event.
    ///
    /// Used right after start, when the first actors may all be artificial.
    pub fn run_auto_actions(&mut self) -> EngineResult<ProcessOutcome> {
        self.apply(ProcessInput::AutoActions)
    }

    fn apply(&mut self, input: ProcessInput<'_>) -> EngineResult<ProcessOutcome> {
        if !self.is_active() {
            return Err(EngineError::invalid_phase("active", "completed"));
        }
        let outcome = self.engine.process_with(input)?;
        debug!(
            session = self.id,
            room = self.room_id,
            input = input.label(),
            events = outcome.events.len(),
            "input processed"
        );
        if outcome.finished {
            self.complete();
        }
        Ok(outcome)
    }

    /// A `timeout` event stamped for the armed timer, if any.
    ///
    /// Schedulers should deliver this event, not a bare one, so a late
    /// delivery after the stage moved on is ignored.
    #[must_use]
    pub fn timeout_event(&self) -> Option<GameEvent> {
        let timer = self.engine.phase_clock().timer()?;
        let mut event = GameEvent::timeout()
            .with("generation", timer.generation)
            .with("phase", timer.phase.as_str());
        if let Some(stage) = timer.metadata.stage.as_deref() {
            event = event.with("stage", stage);
        }
        Some(event)
    }

    #[must_use]
    pub fn view(&self, viewer: Option<PlayerId>) -> PublicView {
        self.engine.public_view(viewer)
    }

    #[must_use]
    pub fn result(&self) -> Option<GameResult> {
        self.engine.result()
    }

    pub fn persistable(&self) -> Result<PersistableFields, SnapshotError> {
        self.engine.persistable()
    }

    /// Mark the session completed. Idempotent.
    pub fn complete(&mut self) {
        if self.status == SessionStatus::Active {
            self.status = SessionStatus::Completed;
            info!(session = self.id, room = self.room_id, result = ?self.engine.result(), "session completed");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("room_id", &self.room_id)
            .field("variant", &self.variant())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// All sessions known to this process.
#[derive(Debug, Default)]
pub struct SessionDirectory {
    factory: EngineFactory,
    sessions: FxHashMap<SessionId, Session>,
    active_by_room: FxHashMap<RoomId, SessionId>,
    next_id: SessionId,
}

impl SessionDirectory {
    pub fn new(factory: EngineFactory) -> Self {
        Self {
            factory,
            sessions: FxHashMap::default(),
            active_by_room: FxHashMap::default(),
            next_id: 1,
        }
    }

    #[must_use]
    pub fn factory(&self) -> &EngineFactory {
        &self.factory
    }

    /// Start a game in `room_id`, completing any game already running there.
    ///
    /// Artificial players get their first turn before this returns; the
    /// outcome carries their notifications and the initial role assignments.
    pub fn start(
        &mut self,
        room_id: RoomId,
        config: RoomConfig,
        participants: &[Participant],
        seed: u64,
    ) -> EngineResult<(SessionId, ProcessOutcome)> {
        let engine = self.factory.start(config, participants, seed)?;
        let id = self.allocate_id();
        let mut session = Session::new(id, room_id, engine);
        let outcome = session.run_auto_actions()?;

        self.close_room(room_id);
        info!(session = id, room = room_id, variant = %session.variant(), "session started");
        self.register(session);
        Ok((id, outcome))
    }

    /// Re-register a persisted session.
    ///
    /// An active session restored into a room completes whichever other
    /// session was active there.
    pub fn load(&mut self, id: SessionId, room_id: RoomId, snapshot: SessionSnapshot) -> &Session {
        let session = Session::new(id, room_id, self.factory.restore(snapshot));
        self.next_id = self.next_id.max(id + 1);
        debug!(session = id, room = room_id, status = ?session.status(), "session loaded");
        self.register(session)
    }

    fn register(&mut self, session: Session) -> &Session {
        let (id, room_id) = (session.id(), session.room_id());
        if let Some(old_room) = self.sessions.get(&id).map(Session::room_id) {
            if old_room != room_id && self.active_by_room.get(&old_room) == Some(&id) {
                self.active_by_room.remove(&old_room);
            }
        }
        if session.is_active() {
            if let Some(previous) = self.active_by_room.insert(room_id, id) {
                if previous != id {
                    if let Some(old) = self.sessions.get_mut(&previous) {
                        old.complete();
                    }
                }
            }
        } else if self.active_by_room.get(&room_id) == Some(&id) {
            self.active_by_room.remove(&room_id);
        }
        match self.sessions.entry(id) {
            Entry::Occupied(mut slot) => {
                slot.insert(session);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(session),
        }
    }

    fn allocate_id(&mut self) -> SessionId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    #[must_use]
    pub fn active_in(&self, room_id: RoomId) -> Option<&Session> {
        self.active_by_room
            .get(&room_id)
            .and_then(|id| self.sessions.get(id))
    }

    /// Route an event to a session.
    pub fn dispatch(&mut self, id: SessionId, event: &GameEvent) -> EngineResult<ProcessOutcome> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| EngineError::Configuration(format!("unknown session {id}")))?;
        let outcome = session.process(event)?;
        if !session.is_active() {
            let room = session.room_id();
            if self.active_by_room.get(&room) == Some(&id) {
                self.active_by_room.remove(&room);
            }
        }
        Ok(outcome)
    }

    /// Complete the active session in a room, if any.
    pub fn close_room(&mut self, room_id: RoomId) -> Option<SessionId> {
        let id = self.active_by_room.remove(&room_id)?;
        if let Some(session) = self.sessions.get_mut(&id) {
            session.complete();
        }
        Some(id)
    }

    /// Drop every completed session and return their ids.
    ///
    /// Active sessions are kept. Hosts call this after persisting results.
    pub fn evict_completed(&mut self) -> Vec<SessionId> {
        let mut evicted: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, session)| !session.is_active())
            .map(|(&id, _)| id)
            .collect();
        evicted.sort_unstable();
        for id in &evicted {
            self.sessions.remove(id);
        }
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "completed sessions evicted");
        }
        evicted
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
