// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Monotone incremental transcript emission: turns a freshly merged
//! transcript plus the observed stream duration into the minimal set of
//! `speakers`/`segment`/`partial` events that advance what's already been
//! shown, never retracting or duplicating a final segment.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::events::{OutputEvent, SpeakerInfo};
use crate::types::MergedTranscript;

/// Floating-point slack absorbing jitter when the same tail is reprocessed.
const EMIT_SLACK_SECONDS: f64 = 0.02;

const DEFAULT_STREAM_KEY: &str = "default";

#[derive(Default)]
struct EmitterState {
    /// Global across all streams, deliberately: speaker ids are already
    /// stream-qualified, so a speaker "known" on one stream doesn't suppress
    /// the same label surfacing distinctly on another.
    seen_speakers: HashSet<String>,
    /// Per stream_name (falling back to `"default"`), unlike `seen_speakers`.
    last_emitted_t1: HashMap<String, f64>,
    last_partial: HashMap<String, (String, f64, String)>,
}

/// Owns the emitter's cross-call state. One instance is shared process-wide.
#[derive(Default)]
pub struct TranscriptEmitter {
    state: Mutex<EmitterState>,
}

impl TranscriptEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produces the events for one pipeline result. `finalize_lag` protects
    /// the growing tail from premature emission; `finalize` forces a full
    /// flush (used on stream stop).
    #[must_use]
    pub fn emit(
        &self,
        merged: &MergedTranscript,
        current_duration: f64,
        finalize: bool,
        finalize_lag: f64,
        stream_name: Option<&str>,
    ) -> Vec<OutputEvent> {
        if merged.turns.is_empty() {
            return Vec::new();
        }

        let stream_key = stream_name.unwrap_or(DEFAULT_STREAM_KEY).to_string();
        let stream_label = stream_name.unwrap_or(DEFAULT_STREAM_KEY).to_string();
        let mut events = Vec::new();
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut newly_seen = Vec::new();
        for turn in &merged.turns {
            let speaker_id = format!("{stream_label}:{}", turn.speaker);
            if state.seen_speakers.insert(speaker_id.clone()) {
                newly_seen.push(speaker_id);
            }
        }
        if !newly_seen.is_empty() {
            let mut known: Vec<SpeakerInfo> = state
                .seen_speakers
                .iter()
                .map(|id| SpeakerInfo { speaker_id: id.clone(), name: id.clone() })
                .collect();
            known.sort_by(|a, b| a.speaker_id.cmp(&b.speaker_id));
            events.push(OutputEvent::Speakers { known });
        }

        let cutoff = if finalize { current_duration } else { (current_duration - finalize_lag).max(0.0) };
        let last_t1 = state.last_emitted_t1.get(&stream_key).copied().unwrap_or(0.0);
        let mut max_emitted = last_t1;

        for turn in &merged.turns {
            if turn.end <= cutoff && turn.end > last_t1 + EMIT_SLACK_SECONDS {
                events.push(OutputEvent::Segment {
                    speaker: turn.speaker.clone(),
                    speaker_id: format!("{stream_label}:{}", turn.speaker),
                    stream: stream_label.clone(),
                    t0: turn.start,
                    t1: turn.end,
                    text: turn.text.clone(),
                });
                max_emitted = max_emitted.max(turn.end);
            }
        }
        if max_emitted > last_t1 {
            state.last_emitted_t1.insert(stream_key.clone(), max_emitted);
        }

        if !finalize {
            if let Some(last_turn) = merged.turns.last() {
                if last_turn.end > cutoff {
                    let fingerprint = (last_turn.speaker.clone(), last_turn.start, last_turn.text.clone());
                    let changed = state.last_partial.get(&stream_key) != Some(&fingerprint);
                    if changed {
                        events.push(OutputEvent::Partial {
                            speaker_id: format!("{stream_label}:{}", last_turn.speaker),
                            stream: stream_label.clone(),
                            t0: last_turn.start,
                            text: last_turn.text.clone(),
                        });
                        state.last_partial.insert(stream_key, fingerprint);
                    }
                }
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LabelledWord, SpeakerTurn};

    fn turn(speaker: &str, start: f64, end: f64, text: &str) -> SpeakerTurn {
        SpeakerTurn {
            speaker: speaker.to_string(),
            start,
            end,
            text: text.to_string(),
            words: vec![LabelledWord { text: text.to_string(), start, end, speaker: speaker.to_string() }],
        }
    }

    #[test]
    fn empty_transcript_emits_nothing() {
        let emitter = TranscriptEmitter::new();
        let merged = MergedTranscript::default();
        assert!(emitter.emit(&merged, 10.0, false, 5.0, Some("system")).is_empty());
    }

    #[test]
    fn new_speaker_triggers_speakers_event_once() {
        let emitter = TranscriptEmitter::new();
        let merged = MergedTranscript { turns: vec![turn("a", 0.0, 1.0, "hi")], words: vec![], segments: vec![] };
        let first = emitter.emit(&merged, 20.0, true, 5.0, Some("system"));
        assert!(matches!(first[0], OutputEvent::Speakers { .. }));
        let second = emitter.emit(&merged, 21.0, true, 5.0, Some("system"));
        assert!(!second.iter().any(|e| matches!(e, OutputEvent::Speakers { .. })));
    }

    #[test]
    fn segments_respect_finalize_lag_cutoff() {
        let emitter = TranscriptEmitter::new();
        let merged = MergedTranscript {
            turns: vec![turn("a", 0.0, 4.0, "early"), turn("a", 4.5, 9.0, "late")],
            words: vec![],
            segments: vec![],
        };
        // duration=10, lag=5 => cutoff=5: "early" (end=4.0) qualifies, "late" (end=9.0) doesn't.
        let events = emitter.emit(&merged, 10.0, false, 5.0, Some("system"));
        let segments: Vec<_> = events
            .iter()
            .filter_map(|e| if let OutputEvent::Segment { text, .. } = e { Some(text.clone()) } else { None })
            .collect();
        assert_eq!(segments, vec!["early"]);
    }

    #[test]
    fn segment_t1_is_strictly_increasing_across_calls() {
        let emitter = TranscriptEmitter::new();
        let first_pass =
            MergedTranscript { turns: vec![turn("a", 0.0, 4.0, "one")], words: vec![], segments: vec![] };
        let events1 = emitter.emit(&first_pass, 10.0, false, 5.0, Some("system"));
        let t1_values_1: Vec<f64> =
            events1.iter().filter_map(|e| if let OutputEvent::Segment { t1, .. } = e { Some(*t1) } else { None }).collect();

        let second_pass = MergedTranscript {
            turns: vec![turn("a", 0.0, 4.0, "one"), turn("a", 4.1, 8.0, "two")],
            words: vec![],
            segments: vec![],
        };
        let events2 = emitter.emit(&second_pass, 20.0, false, 5.0, Some("system"));
        let t1_values_2: Vec<f64> =
            events2.iter().filter_map(|e| if let OutputEvent::Segment { t1, .. } = e { Some(*t1) } else { None }).collect();

        assert_eq!(t1_values_1, vec![4.0]);
        assert_eq!(t1_values_2, vec![8.0]); // "one" not re-emitted
    }

    #[test]
    fn duplicate_partial_fingerprint_is_suppressed() {
        let emitter = TranscriptEmitter::new();
        let merged = MergedTranscript { turns: vec![turn("a", 0.0, 9.0, "still talking")], words: vec![], segments: vec![] };
        let first = emitter.emit(&merged, 10.0, false, 5.0, Some("system"));
        assert!(first.iter().any(|e| matches!(e, OutputEvent::Partial { .. })));
        let second = emitter.emit(&merged, 10.2, false, 5.0, Some("system"));
        assert!(!second.iter().any(|e| matches!(e, OutputEvent::Partial { .. })));
    }

    #[test]
    fn last_emitted_t1_is_keyed_per_stream_but_seen_speakers_is_global() {
        let emitter = TranscriptEmitter::new();
        let sys = MergedTranscript { turns: vec![turn("a", 0.0, 4.0, "sys")], words: vec![], segments: vec![] };
        let mic = MergedTranscript { turns: vec![turn("a", 0.0, 4.0, "mic")], words: vec![], segments: vec![] };
        emitter.emit(&sys, 10.0, true, 5.0, Some("system"));
        let mic_events = emitter.emit(&mic, 10.0, true, 5.0, Some("mic"));
        // "system:a" already seen, but "mic:a" has not, so a fresh speakers event fires.
        assert!(mic_events.iter().any(|e| matches!(e, OutputEvent::Speakers { .. })));
    }
}
