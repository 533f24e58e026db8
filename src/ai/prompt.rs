//! Shared prompt fragments.

use std::fmt::Write;

use super::style::AiStyle;
use crate::core::{PlayerId, Roster};
use crate::cycle::Speech;

/// Speeches included in a prompt.
pub(crate) const HISTORY_LIMIT: usize = 6;

pub(crate) const SPEECH_MAX_TOKENS: u32 = 120;
pub(crate) const VOTE_MAX_TOKENS: u32 = 160;
pub(crate) const VOTE_TEMPERATURE: f32 = 0.3;

pub(crate) fn system_prompt(game: &str, style: AiStyle) -> String {
    format!(
        "You are a player in a game of {game}. Stay in character, never reveal \
         that you are an AI, and never state your hidden role outright. {}",
        style.persona()
    )
}

/// The last few speeches as `Name: text` lines.
pub(crate) fn format_history<R: Copy + PartialEq>(speeches: &[Speech], roster: &Roster<R>) -> String {
    let start = speeches.len().saturating_sub(HISTORY_LIMIT);
    let mut out = String::new();
    for speech in &speeches[start..] {
        let _ = writeln!(
            out,
            "- {} (round {}): {}",
            roster.display_name(speech.player),
            speech.round,
            speech.content
        );
    }
    if out.is_empty() {
        out.push_str("- (nobody has spoken yet)\n");
    }
    out
}

/// Candidates as `id: Name` lines.
pub(crate) fn format_candidates<R: Copy + PartialEq>(candidates: &[PlayerId], roster: &Roster<R>) -> String {
    let mut out = String::new();
    for id in candidates {
        let _ = writeln!(out, "- {}: {}", id.raw(), roster.display_name(*id));
    }
    out
}

pub(crate) const DECISION_FORMAT: &str =
    "Answer with JSON only: {\"target_id\": <id from the list>, \"reason\": \"<one short sentence>\"}";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Participant, PlayerAssignment};
    use chrono::{DateTime, Utc};

    #[test]
    fn test_history_keeps_latest() {
        let roster = Roster::new(vec![PlayerAssignment::new(&Participant::human(1, "Ann"), (), "")]).unwrap();
        let speeches: Vec<Speech> = (0..10)
            .map(|i| Speech {
                player: PlayerId(1),
                content: format!("line {i}"),
                is_ai: false,
                round: 1,
                at: DateTime::<Utc>::default(),
            })
            .collect();
        let history = format_history(&speeches, &roster);
        assert_eq!(history.lines().count(), HISTORY_LIMIT);
        assert!(history.contains("Ann (round 1): line 9"));
        assert!(!history.contains("line 3"));
    }

    #[test]
    fn test_candidates_listed_by_id() {
        let roster = Roster::new(vec![
            PlayerAssignment::new(&Participant::human(4, "Dee"), (), ""),
            PlayerAssignment::new(&Participant::human(9, "Ike"), (), ""),
        ])
        .unwrap();
        let text = format_candidates(&[PlayerId(4), PlayerId(9)], &roster);
        assert_eq!(text, "- 4: Dee\n- 9: Ike\n");
    }
}
