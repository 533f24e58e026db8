//! Engine construction.
//!
//! `EngineFactory` maps a `Variant` to its engine implementation and wires
//! in the host's collaborators.

use std::sync::Arc;

use tracing::info;

use super::engine::GameEngine;
use super::snapshot::SessionSnapshot;
use crate::core::{Clock, EngineResult, Participant, RoomConfig, SystemClock};
use crate::games::undercover::UndercoverGame;
use crate::games::werewolf::WerewolfGame;
use crate::ports::{ContentFilter, PassthroughFilter, StaticWordPool, TextGenerator, WordPool};

/// Host-provided services shared by every engine.
#[derive(Clone)]
pub struct Collaborators {
    pub content_filter: Arc<dyn ContentFilter>,
    pub word_pool: Arc<dyn WordPool>,
    pub text_generator: Option<Arc<dyn TextGenerator>>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    pub fn new(
        content_filter: Arc<dyn ContentFilter>,
        word_pool: Arc<dyn WordPool>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            content_filter,
            word_pool,
            text_generator: None,
            clock,
        }
    }

    #[must_use]
    pub fn with_text_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.text_generator = Some(generator);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_content_filter(mut self, filter: Arc<dyn ContentFilter>) -> Self {
        self.content_filter = filter;
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::new(
            Arc::new(PassthroughFilter),
            Arc::new(StaticWordPool::builtin()),
            Arc::new(SystemClock),
        )
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("text_generator", &self.text_generator.is_some())
            .finish_non_exhaustive()
    }
}

/// Builds and restores engines.
#[derive(Clone, Debug, Default)]
pub struct EngineFactory {
    collaborators: Collaborators,
}

impl EngineFactory {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    #[must_use]
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Start a new game. Participants are given in seat order.
    pub fn start(
        &self,
        config: RoomConfig,
        participants: &[Participant],
        seed: u64,
    ) -> EngineResult<Box<dyn GameEngine>> {
        let variant = config.variant();
        let engine: Box<dyn GameEngine> = match config {
            RoomConfig::Undercover(config) => Box::new(UndercoverGame::start(
                config,
                participants,
                self.collaborators.clone(),
                seed,
            )?),
            RoomConfig::Werewolf(config) => Box::new(WerewolfGame::start(
                config,
                participants,
                self.collaborators.clone(),
                seed,
            )?),
        };
        info!(variant = %variant, players = participants.len(), seed, "game started");
        Ok(engine)
    }

    /// Rebuild an engine from persisted state.
    #[must_use]
    pub fn restore(&self, snapshot: SessionSnapshot) -> Box<dyn GameEngine> {
        match snapshot {
            SessionSnapshot::Undercover(state) => {
                Box::new(UndercoverGame::from_state(*state, self.collaborators.clone()))
            }
            SessionSnapshot::Werewolf(state) => {
                Box::new(WerewolfGame::from_state(*state, self.collaborators.clone()))
            }
        }
    }
}
