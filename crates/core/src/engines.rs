// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Narrow trait boundaries for the external normalisation, ASR, and
//! diarisation engines. The pipeline driver depends only on these traits; it
//! never inherits from, or downcasts to, a concrete engine type.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{CoreError, Result};
use crate::types::{DiarSegment, Word};

/// Converts arbitrary input audio into a 16 kHz mono signed-16-bit container.
pub trait Normaliser: Send + Sync {
    fn normalise(&self, input: &Path, dest_dir: &Path) -> Result<PathBuf>;
}

/// Transcribes an audio file into text and word-level timings.
pub trait AsrEngine: Send + Sync {
    fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<(String, Vec<Word>)>;
}

/// Produces speaker segments for an audio file.
pub trait Diariser: Send + Sync {
    fn diarise(&self, audio_path: &Path) -> Result<Vec<DiarSegment>>;
}

/// Tag used only to select which concrete [`Diariser`] a caller constructs;
/// the pipeline driver never matches on this itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiarBackend {
    Sortformer,
    Senko,
}

impl DiarBackend {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sortformer => "sortformer",
            Self::Senko => "senko",
        }
    }
}

impl std::str::FromStr for DiarBackend {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sortformer" => Ok(Self::Sortformer),
            "senko" => Ok(Self::Senko),
            other => Err(CoreError::Configuration(format!("unknown diarisation backend: {other}"))),
        }
    }
}

/// Normaliser that shells out to the system `ffmpeg` binary, mirroring the
/// reference implementation's subprocess-based normalisation.
#[derive(Debug, Clone, Default)]
pub struct FfmpegNormaliser;

impl FfmpegNormaliser {
    /// Checks that an `ffmpeg` binary is reachable on `PATH`.
    pub fn check_available() -> Result<()> {
        Command::new("ffmpeg")
            .arg("-version")
            .output()
            .map_err(|e| CoreError::MissingTranscoder(format!("ffmpeg not runnable: {e}")))?;
        Ok(())
    }
}

impl Normaliser for FfmpegNormaliser {
    fn normalise(&self, input: &Path, dest_dir: &Path) -> Result<PathBuf> {
        Self::check_available()?;
        let dest_path = dest_dir.join(format!(
            "{}-norm.wav",
            input.file_stem().and_then(|s| s.to_str()).unwrap_or("audio")
        ));

        let status = Command::new("ffmpeg")
            .args(["-y", "-i"])
            .arg(input)
            .args(["-ac", "1", "-ar", "16000", "-sample_fmt", "s16"])
            .arg(&dest_path)
            .status()
            .map_err(|e| CoreError::MissingTranscoder(format!("failed to invoke ffmpeg: {e}")))?;

        if !status.success() {
            tracing::warn!(%status, input = %input.display(), "ffmpeg normalisation failed");
            return Err(CoreError::Codec(format!("ffmpeg exited with status {status}")));
        }
        Ok(dest_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diar_backend_round_trips_through_str() {
        assert_eq!("senko".parse::<DiarBackend>().unwrap(), DiarBackend::Senko);
        assert_eq!("sortformer".parse::<DiarBackend>().unwrap(), DiarBackend::Sortformer);
        assert!("nonsense".parse::<DiarBackend>().is_err());
    }
}
