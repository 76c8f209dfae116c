// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Command-line flags for the capture dispatcher, matching the configuration
//! surface of the framed-protocol ingest/transcription pipeline.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Which captured stream(s) to run the transcription pipeline over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "lower")]
pub enum TranscribeStream {
    System,
    Mic,
    Both,
}

/// Live multi-stream audio capture dispatcher: ingests framed audio from
/// stdin, persists it durably, and emits incremental speaker-labelled
/// transcripts as NDJSON records on stdout.
#[derive(Debug, Parser)]
#[command(name = "meetcap", version, about)]
pub struct Cli {
    /// Directory for persisted raw/container audio files and ephemeral work files.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Which stream(s) to run the transcription pipeline over.
    #[arg(long, value_enum, default_value_t = TranscribeStream::System)]
    pub transcribe_stream: TranscribeStream,

    /// Diarisation backend to use.
    #[arg(long, default_value = "senko")]
    pub diar_backend: String,

    /// Diarisation model identifier.
    #[arg(long, default_value = "default")]
    pub diar_model: String,

    /// ASR model identifier.
    #[arg(long, default_value = "default")]
    pub asr_model: String,

    /// Forced transcription language (auto-detected if omitted).
    #[arg(long)]
    pub language: Option<String>,

    /// Maximum inter-word gap, in seconds, before a new turn is started.
    #[arg(long, default_value_t = 0.8)]
    pub gap_threshold: f64,

    /// Maximum turn duration, in seconds, before it is force-split.
    #[arg(long, default_value_t = 60.0)]
    pub max_turn_duration: f64,

    /// Tolerance, in seconds, for assigning a word to the nearest diarisation
    /// segment when it does not overlap any segment.
    #[arg(long, default_value_t = 0.25)]
    pub speaker_tolerance: f64,

    /// Minimum spacing, in seconds, between live pipeline runs for a stream.
    #[arg(long, default_value_t = 15.0)]
    pub live_interval: f64,

    /// Minimum stream duration, in seconds, before the first live pipeline run.
    #[arg(long, default_value_t = 10.0)]
    pub live_min_seconds: f64,

    /// How far, in seconds, behind the live edge a turn must be before it is
    /// emitted as a final segment.
    #[arg(long, default_value_t = 5.0)]
    pub finalize_lag: f64,

    /// Emit periodic `meter` (RMS level) events.
    #[arg(long)]
    pub emit_meters: bool,

    /// Keep the raw PCM files after the run completes.
    #[arg(long)]
    pub keep_raw: bool,

    /// Keep the WAV container files after the run completes.
    #[arg(long)]
    pub keep_container: bool,

    /// Disable live incremental processing; run the pipeline once at end-of-input.
    #[arg(long)]
    pub no_live: bool,

    /// Enable debug-level diagnostic logging.
    #[arg(long)]
    pub verbose: bool,
}
