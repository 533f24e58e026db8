//! Personality styles and name pools for artificial players.

use serde::{Deserialize, Serialize};

use crate::core::GameRng;

/// Speaking personality of an artificial player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiStyle {
    #[default]
    Balanced,
    Rational,
    Humor,
}

impl AiStyle {
    pub const ALL: [AiStyle; 3] = [Self::Balanced, Self::Rational, Self::Humor];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::Rational => "rational",
            Self::Humor => "humor",
        }
    }

    /// Parse a style key; unknown keys resolve to [`AiStyle::Balanced`].
    #[must_use]
    pub fn resolve(key: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(key.trim()))
            .unwrap_or_default()
    }

    /// Opening phrases for template speech.
    pub(crate) fn prefixes(self) -> &'static [&'static str] {
        match self {
            Self::Balanced => &["I think", "Quick thought:", "The way I see it,"],
            Self::Rational => &["Looking at the clues,", "Going by the meaning,", "All things considered,"],
            Self::Humor => &["Ha!", "Okay, joke time:", "Relax, everyone,"],
        }
    }

    /// Closing phrases for template speech.
    pub(crate) fn suffixes(self) -> &'static [&'static str] {
        match self {
            Self::Balanced => &["What do you all think?", "There may be other readings.", "Just my take."],
            Self::Rational => &["That seems the most logical.", "Happy to hear corrections.", "That's my call."],
            Self::Humor => &["Please don't vote me!", "I'll stop there.", "No throwing things."],
        }
    }

    /// Persona line for model prompts.
    pub(crate) fn persona(self) -> &'static str {
        match self {
            Self::Balanced => "You speak in a calm, friendly way and keep things short.",
            Self::Rational => "You reason step by step from the clues and sound analytical.",
            Self::Humor => "You are light-hearted and slip in a small joke.",
        }
    }
}

impl std::fmt::Display for AiStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick a style at random.
pub fn random_style(rng: &mut GameRng) -> AiStyle {
    rng.pick(&AiStyle::ALL).unwrap_or_default()
}

const NAME_POOL: &[&str] = &[
    "Spark Analyst",
    "Logic Oriole",
    "Swift Courier",
    "Quip Master",
    "Calm Observer",
    "Idea Painter",
    "Wheatfield Poet",
    "Storm Detective",
];

/// Pick a display name not already taken, falling back to a numbered name.
pub fn generate_display_name<'a>(
    existing: impl IntoIterator<Item = &'a str>,
    rng: &mut GameRng,
) -> String {
    let taken: Vec<&str> = existing.into_iter().collect();
    let mut candidates = NAME_POOL.to_vec();
    rng.shuffle(&mut candidates);
    candidates
        .into_iter()
        .find(|name| !taken.contains(name))
        .map(str::to_string)
        .unwrap_or_else(|| format!("AI Player {}", rng.gen_range_usize(100..1000)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_unknown_style() {
        assert_eq!(AiStyle::resolve("humor"), AiStyle::Humor);
        assert_eq!(AiStyle::resolve(" Rational "), AiStyle::Rational);
        assert_eq!(AiStyle::resolve("grumpy"), AiStyle::Balanced);
    }

    #[test]
    fn test_style_serde() {
        assert_eq!(serde_json::to_string(&AiStyle::Humor).unwrap(), "\"humor\"");
        let parsed: AiStyle = serde_json::from_str("\"rational\"").unwrap();
        assert_eq!(parsed, AiStyle::Rational);
    }

    #[test]
    fn test_display_name_avoids_existing() {
        let mut rng = GameRng::new(3);
        let taken: Vec<&str> = NAME_POOL[..NAME_POOL.len() - 1].to_vec();
        let name = generate_display_name(taken.iter().copied(), &mut rng);
        assert_eq!(name, NAME_POOL[NAME_POOL.len() - 1]);
    }

    #[test]
    fn test_display_name_pool_exhausted() {
        let mut rng = GameRng::new(3);
        let name = generate_display_name(NAME_POOL.iter().copied(), &mut rng);
        assert!(name.starts_with("AI Player "));
    }
}
