//! Target decisions and tolerant parsing of model output.
//!
//! A model is asked for `{"target_id": <id>, "reason": "..."}` but may wrap
//! it in prose or code fences, or answer in plain text. Parsing tries the
//! JSON object first and then the first integer in the text.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::core::{GameRng, PlayerId};
use crate::cycle::Speech;
use crate::ports::GenerationError;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Where a decision came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecisionSource {
    Model,
    Heuristic,
}

impl DecisionSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Heuristic => "heuristic",
        }
    }
}

/// A proposed target. Not yet checked for legality.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decision {
    pub target: Option<PlayerId>,
    pub reason: Option<String>,
    pub source: DecisionSource,
}

impl Decision {
    pub fn heuristic(target: Option<PlayerId>) -> Self {
        Self {
            target,
            reason: None,
            source: DecisionSource::Heuristic,
        }
    }

    pub fn model(target: PlayerId, reason: Option<String>) -> Self {
        Self {
            target: Some(target),
            reason,
            source: DecisionSource::Model,
        }
    }
}

/// Parsed model answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedDecision {
    pub target: PlayerId,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
struct RawDecision {
    #[serde(default, alias = "targetId", alias = "target")]
    target_id: Option<Value>,
    #[serde(default, alias = "rationale")]
    reason: Option<String>,
}

fn value_to_id(value: &Value) -> Option<PlayerId> {
    match value {
        Value::Number(n) => n.as_u64().map(PlayerId),
        Value::String(s) => s.trim().trim_start_matches('#').parse().ok().map(PlayerId),
        _ => None,
    }
}

/// Extract a target id and optional rationale from free-form model output.
pub fn parse_decision(text: &str) -> Result<ParsedDecision, GenerationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::MalformedResponse("empty response".into()));
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(raw) = serde_json::from_str::<RawDecision>(&trimmed[start..=end]) {
                if let Some(target) = raw.target_id.as_ref().and_then(value_to_id) {
                    let reason = raw.reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
                    return Ok(ParsedDecision { target, reason });
                }
            }
        }
    }

    let number = NUMBER_RE
        .find(trimmed)
        .ok_or_else(|| GenerationError::MalformedResponse(format!("no target in {trimmed:?}")))?;
    let target = number
        .as_str()
        .parse()
        .map(PlayerId)
        .map_err(|_| GenerationError::MalformedResponse(format!("target out of range: {}", number.as_str())))?;
    Ok(ParsedDecision {
        target,
        reason: Some(trimmed.to_string()),
    })
}

/// Return `proposed` if it is a legal non-self target, otherwise a random
/// legal alternative. Self is used only when it is the sole legal choice.
pub fn ensure_legal_target(
    proposed: Option<PlayerId>,
    actor: PlayerId,
    legal: &[PlayerId],
    rng: &mut GameRng,
) -> PlayerId {
    if let Some(target) = proposed {
        if target != actor && legal.contains(&target) {
            return target;
        }
    }
    let others: Vec<PlayerId> = legal.iter().copied().filter(|p| *p != actor).collect();
    let pool = if others.is_empty() { legal } else { &others };
    let substitute = rng.pick(pool).unwrap_or(actor);
    if let Some(rejected) = proposed {
        debug!(actor = %actor, rejected = %rejected, substitute = %substitute, "illegal target replaced");
    }
    substitute
}

/// The candidate most recently named in someone else's speech.
pub fn last_mentioned(
    speeches: &[Speech],
    me: PlayerId,
    candidates: &[(PlayerId, &str)],
) -> Option<PlayerId> {
    speeches.iter().rev().filter(|s| s.player != me).find_map(|speech| {
        let content = speech.content.to_lowercase();
        candidates
            .iter()
            .filter(|(id, name)| *id != me && *id != speech.player && !name.trim().is_empty())
            .find(|(_, name)| content.contains(&name.to_lowercase()))
            .map(|(id, _)| *id)
    })
}
