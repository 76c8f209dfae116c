// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Shared data model for the transcription/diarisation pipeline: words, speaker
//! turns, and diarisation segments.

use serde::{Deserialize, Serialize};

/// A speaker label that has not yet been resolved by [`crate::speaker`].
pub const UNKNOWN_SPEAKER: &str = "UNKNOWN";

/// One recognised word with its timing, in seconds from stream origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl Word {
    #[must_use]
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self { text: text.into(), start, end }
    }

    /// Duration in seconds. May be negative for malformed input; callers
    /// filter those out before use (see [`crate::speaker::assign_speakers`]).
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    #[must_use]
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

/// One diarisation segment: a time span attributed to a single opaque speaker label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiarSegment {
    pub start: f64,
    pub end: f64,
    pub speaker: String,
}

impl DiarSegment {
    #[must_use]
    pub fn new(start: f64, end: f64, speaker: impl Into<String>) -> Self {
        Self { start, end, speaker: speaker.into() }
    }

    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Distance from `t` to this segment's interval; 0 if `t` falls inside.
    #[must_use]
    pub fn distance_to(&self, t: f64) -> f64 {
        if t < self.start {
            self.start - t
        } else if t > self.end {
            t - self.end
        } else {
            0.0
        }
    }

    /// Overlap, in seconds, between this segment and `[start, end)`. Zero if disjoint.
    #[must_use]
    pub fn overlap(&self, start: f64, end: f64) -> f64 {
        (self.end.min(end) - self.start.max(start)).max(0.0)
    }
}

/// A word with a speaker label attached, prior to or after interpolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelledWord {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub speaker: String,
}

impl LabelledWord {
    #[must_use]
    pub fn from_word(word: Word, speaker: impl Into<String>) -> Self {
        Self { text: word.text, start: word.start, end: word.end, speaker: speaker.into() }
    }
}

/// A maximal run of consecutive same-speaker words under the turn-splitting rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerTurn {
    pub speaker: String,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub words: Vec<LabelledWord>,
}

/// Output of the speaker-assignment + turn-grouping stage.
///
/// # Example
/// ```
/// use meetcap_core::types::MergedTranscript;
///
/// let merged = MergedTranscript { turns: vec![], words: vec![], segments: vec![] };
/// assert!(merged.turns.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedTranscript {
    pub turns: Vec<SpeakerTurn>,
    pub words: Vec<LabelledWord>,
    pub segments: Vec<DiarSegment>,
}
