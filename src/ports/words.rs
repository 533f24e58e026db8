//! Word pair source for the word-guess variant.

use serde::{Deserialize, Serialize};

/// Two related words: the majority word and the undercover word.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPair {
    pub civilian_word: String,
    pub undercover_word: String,
    pub topic: Option<String>,
    pub difficulty: Option<String>,
}

impl WordPair {
    pub fn new(civilian_word: impl Into<String>, undercover_word: impl Into<String>) -> Self {
        Self {
            civilian_word: civilian_word.into(),
            undercover_word: undercover_word.into(),
            topic: None,
            difficulty: None,
        }
    }

    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = Some(difficulty.into());
        self
    }
}

/// Supplies candidate word pairs. The engine picks among them with the session RNG.
pub trait WordPool: Send + Sync {
    fn candidates(&self, topic: Option<&str>, difficulty: Option<&str>) -> Vec<WordPair>;
}

/// Fixed in-memory word list.
#[derive(Clone, Debug, Default)]
pub struct StaticWordPool {
    pairs: Vec<WordPair>,
}

impl StaticWordPool {
    pub fn new(pairs: Vec<WordPair>) -> Self {
        Self { pairs }
    }

    /// A small general-purpose list.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(vec![
            WordPair::new("apple", "pear").with_topic("food").with_difficulty("easy"),
            WordPair::new("coffee", "tea").with_topic("food").with_difficulty("easy"),
            WordPair::new("dumpling", "wonton").with_topic("food").with_difficulty("medium"),
            WordPair::new("piano", "violin").with_topic("music").with_difficulty("easy"),
            WordPair::new("guitar", "ukulele").with_topic("music").with_difficulty("medium"),
            WordPair::new("subway", "bus").with_topic("travel").with_difficulty("easy"),
            WordPair::new("passport", "visa").with_topic("travel").with_difficulty("hard"),
            WordPair::new("lion", "tiger").with_topic("animals").with_difficulty("easy"),
            WordPair::new("dolphin", "whale").with_topic("animals").with_difficulty("medium"),
            WordPair::new("novel", "poem").with_topic("books").with_difficulty("hard"),
        ])
    }
}

impl WordPool for StaticWordPool {
    fn candidates(&self, topic: Option<&str>, difficulty: Option<&str>) -> Vec<WordPair> {
        let matches = |wanted: Option<&str>, have: &Option<String>| {
            wanted.map_or(true, |w| have.as_deref().is_some_and(|h| h.eq_ignore_ascii_case(w)))
        };
        self.pairs
            .iter()
            .filter(|p| matches(topic, &p.topic) && matches(difficulty, &p.difficulty))
            .cloned()
            .collect()
    }
}
