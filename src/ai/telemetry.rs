//! Decision latency metrics.
//!
//! Recorded through the `metrics` facade. Without an installed recorder
//! every call is a no-op.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};

use super::decision::DecisionSource;

/// What an artificial player was deciding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecisionKind {
    Speech,
    Vote,
    Night,
}

impl DecisionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Speech => "speech",
            Self::Vote => "vote",
            Self::Night => "night",
        }
    }
}

/// Register metric descriptions with the host's recorder.
pub fn describe_metrics() {
    describe_histogram!(
        "deduction_ai_decision_seconds",
        "Time taken by an artificial player to produce a decision"
    );
    describe_counter!(
        "deduction_ai_fallback_total",
        "Model decisions replaced by the heuristic path"
    );
}

pub(crate) fn record_decision(kind: DecisionKind, source: DecisionSource, elapsed: Duration) {
    histogram!(
        "deduction_ai_decision_seconds",
        "kind" => kind.as_str(),
        "source" => source.as_str(),
    )
    .record(elapsed.as_secs_f64());
}

pub(crate) fn record_fallback(kind: DecisionKind) {
    counter!("deduction_ai_fallback_total", "kind" => kind.as_str()).increment(1);
}
