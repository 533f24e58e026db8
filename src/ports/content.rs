//! Speech content filtering.
//!
//! Human speech is checked in `Reject` mode (banned terms fail the event);
//! AI and system speech is checked in `Mask` mode (banned terms are starred out).

use regex_lite::{NoExpand, Regex};
use thiserror::Error;

use crate::core::EngineError;

/// How the filter treats banned terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    /// Replace each hit with asterisks.
    Mask,
    /// Fail, listing the hits.
    Reject,
}

/// Text contained banned terms in reject mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("content contains banned words: {}", .banned.join(", "))]
pub struct PolicyViolation {
    pub banned: Vec<String>,
}

impl From<PolicyViolation> for EngineError {
    fn from(err: PolicyViolation) -> Self {
        EngineError::ContentPolicyViolation(err.to_string())
    }
}

/// Sanitizes player text.
pub trait ContentFilter: Send + Sync {
    fn sanitize(&self, text: &str, mode: FilterMode) -> Result<String, PolicyViolation>;
}

/// Filter that accepts everything unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughFilter;

impl ContentFilter for PassthroughFilter {
    fn sanitize(&self, text: &str, _mode: FilterMode) -> Result<String, PolicyViolation> {
        Ok(text.to_string())
    }
}

/// Case-insensitive banned-word list.
#[derive(Debug, Clone)]
pub struct BannedWordFilter {
    entries: Vec<(String, Regex)>,
}

impl BannedWordFilter {
    /// Build a filter. Blank entries and duplicates are dropped.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleaned: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();
        cleaned.sort_by_key(|w| w.to_lowercase());
        cleaned.dedup_by_key(|w| w.to_lowercase());

        // Escaped literals always compile.
        let entries = cleaned
            .into_iter()
            .filter_map(|word| {
                let pattern = format!("(?i){}", regex_lite::escape(&word));
                Regex::new(&pattern).ok().map(|re| (word, re))
            })
            .collect();
        Self { entries }
    }

    /// Number of banned entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is banned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ContentFilter for BannedWordFilter {
    fn sanitize(&self, text: &str, mode: FilterMode) -> Result<String, PolicyViolation> {
        match mode {
            FilterMode::Reject => {
                let banned: Vec<String> = self
                    .entries
                    .iter()
                    .filter(|(_, re)| re.is_match(text))
                    .map(|(word, _)| word.clone())
                    .collect();
                if banned.is_empty() {
                    Ok(text.to_string())
                } else {
                    Err(PolicyViolation { banned })
                }
            }
            FilterMode::Mask => {
                let mut masked = text.to_string();
                for (word, re) in &self.entries {
                    let stars = "*".repeat(word.chars().count().max(2));
                    masked = re.replace_all(&masked, NoExpand(&stars)).into_owned();
                }
                Ok(masked)
            }
        }
    }
}
