//! Optional text-generation backend shared by the strategies.
//!
//! Every failure is logged and reported as `None` so callers can fall back
//! to heuristics.

use std::sync::Arc;

use tracing::{debug, warn};

use super::decision::{parse_decision, Decision};
use super::telemetry::{record_fallback, DecisionKind};
use crate::core::PlayerId;
use crate::ports::{GenerationRequest, TextGenerator};

#[derive(Clone, Default)]
pub(crate) struct ModelBackend {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl ModelBackend {
    pub(crate) fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    pub(crate) fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    /// Free text for a speech; `None` on failure or an empty answer.
    pub(crate) fn speech(&self, request: &GenerationRequest) -> Option<String> {
        let generator = self.generator.as_ref()?;
        match generator.generate(request) {
            Ok(text) => {
                let text = text.trim().trim_matches('"').trim();
                if text.is_empty() {
                    debug!("model returned an empty speech");
                    record_fallback(DecisionKind::Speech);
                    None
                } else {
                    Some(text.to_string())
                }
            }
            Err(err) => {
                warn!(error = %err, "speech generation failed, using template");
                record_fallback(DecisionKind::Speech);
                None
            }
        }
    }

    /// A model decision whose target is in `legal` and is not `me`.
    pub(crate) fn decision(
        &self,
        request: &GenerationRequest,
        me: PlayerId,
        legal: &[PlayerId],
    ) -> Option<Decision> {
        let generator = self.generator.as_ref()?;
        let parsed = generator
            .generate(request)
            .and_then(|text| parse_decision(&text));
        match parsed {
            Ok(parsed) if parsed.target != me && legal.contains(&parsed.target) => {
                Some(Decision::model(parsed.target, parsed.reason))
            }
            Ok(parsed) => {
                debug!(player = %me, target = %parsed.target, "model chose an illegal target");
                record_fallback(DecisionKind::Vote);
                None
            }
            Err(err) => {
                warn!(player = %me, error = %err, "vote generation failed, using heuristics");
                record_fallback(DecisionKind::Vote);
                None
            }
        }
    }
}

impl std::fmt::Debug for ModelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBackend")
            .field("configured", &self.is_configured())
            .finish()
    }
}
