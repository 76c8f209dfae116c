// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Overlap + nearest-neighbour speaker labelling of words against diarisation
//! segments, followed by two-pass `UNKNOWN` interpolation.

use crate::types::{DiarSegment, LabelledWord, Word, UNKNOWN_SPEAKER};

const LOOKAHEAD_LIMIT: usize = 10;

/// Assigns a speaker to each word and interpolates any `UNKNOWN` labels.
///
/// Words with `end <= start` are discarded. `tolerance` bounds how far (in
/// seconds) a word's midpoint may sit from the nearest segment before it is
/// labelled `UNKNOWN` rather than borrowing that segment's speaker.
#[must_use]
pub fn assign_speakers(words: &[Word], segments: &[DiarSegment], tolerance: f64) -> Vec<LabelledWord> {
    let mut sorted: Vec<&Word> = words.iter().filter(|w| w.end > w.start).collect();
    sorted.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));

    let labelled: Vec<LabelledWord> = sorted
        .into_iter()
        .map(|word| LabelledWord::from_word(word.clone(), label_one(word, segments, tolerance)))
        .collect();

    interpolate_unknown(labelled)
}

fn label_one(word: &Word, segments: &[DiarSegment], tolerance: f64) -> String {
    if segments.is_empty() {
        return UNKNOWN_SPEAKER.to_string();
    }

    let mut best_overlap = 0.0_f64;
    let mut best_overlap_speaker: Option<&str> = None;
    for seg in segments {
        let overlap = seg.overlap(word.start, word.end);
        if overlap > best_overlap {
            best_overlap = overlap;
            best_overlap_speaker = Some(&seg.speaker);
        }
    }
    if let Some(speaker) = best_overlap_speaker {
        return speaker.to_string();
    }

    let midpoint = word.midpoint();
    let mut best_distance = f64::INFINITY;
    let mut nearest_speaker: Option<&str> = None;
    for seg in segments {
        let distance = seg.distance_to(midpoint);
        if distance < best_distance {
            best_distance = distance;
            nearest_speaker = Some(&seg.speaker);
        }
    }

    match nearest_speaker {
        Some(speaker) if best_distance <= tolerance => speaker.to_string(),
        _ => UNKNOWN_SPEAKER.to_string(),
    }
}

fn interpolate_unknown(mut words: Vec<LabelledWord>) -> Vec<LabelledWord> {
    // Forward pass: an UNKNOWN adopts the last known speaker unless a
    // different known speaker appears within the lookahead window.
    let mut last_known: Option<String> = None;
    for i in 0..words.len() {
        if words[i].speaker != UNKNOWN_SPEAKER {
            last_known = Some(words[i].speaker.clone());
            continue;
        }
        let Some(ref last) = last_known else { continue };

        let next_known = words[i + 1..]
            .iter()
            .take(LOOKAHEAD_LIMIT)
            .find(|w| w.speaker != UNKNOWN_SPEAKER)
            .map(|w| w.speaker.clone());

        match next_known {
            None => words[i].speaker = last.clone(),
            Some(next) if next == *last => words[i].speaker = last.clone(),
            Some(_) => {}
        }
    }

    // Backward pass: anything still UNKNOWN adopts the next known speaker.
    let mut next_known: Option<String> = None;
    for i in (0..words.len()).rev() {
        if words[i].speaker != UNKNOWN_SPEAKER {
            next_known = Some(words[i].speaker.clone());
            continue;
        }
        if let Some(ref next) = next_known {
            words[i].speaker = next.clone();
        }
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_wins_over_nearest_neighbour() {
        let words = vec![Word::new("hi", 0.0, 1.0)];
        let segments = vec![
            DiarSegment::new(0.0, 0.5, "a"),
            DiarSegment::new(0.5, 1.5, "b"),
        ];
        let labelled = assign_speakers(&words, &segments, 0.25);
        // "b" overlaps [0.5,1.0) = 0.5s, "a" overlaps [0.0,0.5) = 0.5s; first-wins on tie.
        assert_eq!(labelled[0].speaker, "a");
    }

    #[test]
    fn no_overlap_within_tolerance_uses_nearest() {
        let words = vec![Word::new("hi", 1.0, 1.1)];
        let segments = vec![DiarSegment::new(0.0, 0.9, "a")];
        let labelled = assign_speakers(&words, &segments, 0.25);
        assert_eq!(labelled[0].speaker, "a");
    }

    #[test]
    fn far_from_any_segment_is_unknown_before_interpolation() {
        let words = vec![Word::new("hi", 10.0, 10.1)];
        let segments = vec![DiarSegment::new(0.0, 0.5, "a")];
        let labelled = assign_speakers(&words, &segments, 0.25);
        assert_eq!(labelled[0].speaker, UNKNOWN_SPEAKER);
    }

    #[test]
    fn unknown_gap_between_same_speaker_is_filled() {
        let words = vec![
            Word::new("a", 0.0, 0.5),
            Word::new("gap", 5.0, 5.1),
            Word::new("b", 10.0, 10.5),
        ];
        let segments = vec![
            DiarSegment::new(0.0, 0.5, "x"),
            DiarSegment::new(10.0, 10.5, "x"),
        ];
        let labelled = assign_speakers(&words, &segments, 0.1);
        assert_eq!(labelled[1].speaker, "x");
    }

    #[test]
    fn unknown_between_different_speakers_stays_unknown_after_forward_pass() {
        let words = vec![
            Word::new("a", 0.0, 0.5),
            Word::new("gap", 5.0, 5.1),
            Word::new("b", 10.0, 10.5),
        ];
        let segments = vec![
            DiarSegment::new(0.0, 0.5, "x"),
            DiarSegment::new(10.0, 10.5, "y"),
        ];
        let labelled = assign_speakers(&words, &segments, 0.1);
        // Forward pass leaves it ambiguous (next known differs), backward pass
        // then assigns the next known speaker.
        assert_eq!(labelled[1].speaker, "y");
    }

    #[test]
    fn leading_unknown_is_filled_by_backward_pass() {
        let words = vec![Word::new("lead", 0.0, 0.1), Word::new("b", 5.0, 5.5)];
        let segments = vec![DiarSegment::new(5.0, 5.5, "y")];
        let labelled = assign_speakers(&words, &segments, 0.1);
        assert_eq!(labelled[0].speaker, "y");
    }
}
