//! Collaborator interfaces the host provides to the engine.
//!
//! - `ContentFilter`: sanitizes submitted speech
//! - `WordPool`: supplies word pairs for the word-guess variant
//! - `TextGenerator`: optional synchronous text generation for AI players
//!
//! Each trait ships with a simple in-memory implementation.

pub mod content;
pub mod generator;
pub mod words;

pub use content::{BannedWordFilter, ContentFilter, FilterMode, PassthroughFilter, PolicyViolation};
pub use generator::{GenerationError, GenerationRequest, TextGenerator};
pub use words::{StaticWordPool, WordPair, WordPool};
