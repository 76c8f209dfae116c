// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Groups labelled words into speaker turns and joins their text with
//! punctuation-aware spacing.

use crate::types::{LabelledWord, SpeakerTurn};

const CLOSING: &[char] = &['.', ',', '!', '?', ';', ':', ')', ']', '}', '"', '\''];

/// Groups `words` (already speaker-labelled, in time order) into turns,
/// breaking on speaker change, an inter-word gap exceeding `gap_threshold`,
/// or cumulative turn duration exceeding `max_turn_duration`.
#[must_use]
pub fn words_to_turns(words: &[LabelledWord], gap_threshold: f64, max_turn_duration: f64) -> Vec<SpeakerTurn> {
    if words.is_empty() {
        return Vec::new();
    }

    let mut turns = Vec::new();
    let mut current: Vec<LabelledWord> = vec![words[0].clone()];

    for pair in words.windows(2) {
        let prev = &pair[0];
        let word = &pair[1];
        let turn_start = current[0].start;

        let speaker_changed = word.speaker != prev.speaker;
        let gap_too_large = word.start - prev.end > gap_threshold;
        let duration_too_large = word.end - turn_start > max_turn_duration;

        if speaker_changed || gap_too_large || duration_too_large {
            turns.push(finish_turn(std::mem::take(&mut current)));
        }
        current.push(word.clone());
    }
    turns.push(finish_turn(current));
    turns
}

fn finish_turn(words: Vec<LabelledWord>) -> SpeakerTurn {
    let speaker = words[0].speaker.clone();
    let start = words[0].start;
    let end = words[words.len() - 1].end;
    let text = join_words_smart(&words);
    SpeakerTurn { speaker, start, end, text, words }
}

/// Joins word texts with punctuation-aware spacing: no leading space before a
/// closing-style token, a single space before everything else. Collapses
/// runs of whitespace and trims the result.
#[must_use]
pub fn join_words_smart(words: &[LabelledWord]) -> String {
    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        if i == 0 {
            out.push_str(&word.text);
            continue;
        }
        let starts_with_closing = word.text.chars().next().is_some_and(|c| CLOSING.contains(&c));
        if !starts_with_closing {
            out.push(' ');
        }
        out.push_str(&word.text);
    }
    while out.contains("  ") {
        out = out.replace("  ", " ");
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LabelledWord;

    fn w(text: &str, start: f64, end: f64, speaker: &str) -> LabelledWord {
        LabelledWord { text: text.to_string(), start, end, speaker: speaker.to_string() }
    }

    #[test]
    fn empty_words_yields_no_turns() {
        assert!(words_to_turns(&[], 0.8, 60.0).is_empty());
    }

    #[test]
    fn speaker_change_splits_turn() {
        let words = vec![w("hi", 0.0, 0.5, "a"), w("there", 0.6, 1.0, "b")];
        let turns = words_to_turns(&words, 0.8, 60.0);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].speaker, "a");
        assert_eq!(turns[1].speaker, "b");
    }

    #[test]
    fn large_gap_splits_turn_even_for_same_speaker() {
        let words = vec![w("hi", 0.0, 0.5, "a"), w("there", 2.0, 2.5, "a")];
        let turns = words_to_turns(&words, 0.8, 60.0);
        assert_eq!(turns.len(), 2);
    }

    #[test]
    fn small_gap_keeps_single_turn() {
        let words = vec![w("hi", 0.0, 0.5, "a"), w("there", 0.9, 1.2, "a")];
        let turns = words_to_turns(&words, 0.8, 60.0);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].text, "hi there");
    }

    #[test]
    fn max_turn_duration_forces_a_split() {
        let words = vec![w("a", 0.0, 0.5, "x"), w("b", 59.9, 61.0, "x")];
        let turns = words_to_turns(&words, 5.0, 60.0);
        assert_eq!(turns.len(), 2);
    }

    #[test]
    fn punctuation_join_has_no_leading_space_on_closing() {
        let words = vec![w("Hello", 0.0, 0.3, "a"), w(",", 0.3, 0.31, "a"), w("world", 0.4, 0.8, "a")];
        let joined = join_words_smart(&words);
        assert_eq!(joined, "Hello, world");
    }

    #[test]
    fn single_word_join_is_idempotent() {
        let words = vec![w("  padded  ", 0.0, 0.1, "a")];
        assert_eq!(join_words_smart(&words), "padded");
    }

    #[test]
    fn no_double_spaces_in_output() {
        let words = vec![w("a", 0.0, 0.1, "x"), w("(", 0.1, 0.11, "x"), w("b", 0.2, 0.3, "x")];
        let joined = join_words_smart(&words);
        assert!(!joined.contains("  "));
    }
}
