//! Game engine trait, construction and projections.
//!
//! Variants implement `GameEngine` to define:
//! - How events move the state machine
//! - What artificial players do
//! - Who sees which hidden information
//!
//! The session layer calls into `GameEngine` but never interprets
//! variant-specific concepts directly.

pub mod engine;
pub mod registry;
pub mod snapshot;
pub mod view;

pub use engine::{GameEngine, GameResult, ProcessInput, ProcessOutcome, Variant};
pub use registry::{Collaborators, EngineFactory};
pub use snapshot::{PersistableFields, SessionSnapshot, SnapshotError};
pub use view::{PlayerView, PublicView, VariantDetail};
