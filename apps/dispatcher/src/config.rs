// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Validated runtime configuration, assembled from [`crate::cli::Cli`].

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use meetcap_core::engines::DiarBackend;

use crate::cli::{Cli, TranscribeStream};

#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: PathBuf,
    pub transcribe_stream: TranscribeStream,
    pub diar_backend: DiarBackend,
    pub diar_model: String,
    pub asr_model: String,
    pub language: Option<String>,
    pub gap_threshold: f64,
    pub max_turn_duration: f64,
    pub speaker_tolerance: f64,
    pub live_interval: f64,
    pub live_min_seconds: f64,
    pub finalize_lag: f64,
    pub emit_meters: bool,
    pub keep_raw: bool,
    pub keep_container: bool,
    pub no_live: bool,
    pub verbose: bool,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        for (name, value) in [
            ("gap_threshold", cli.gap_threshold),
            ("max_turn_duration", cli.max_turn_duration),
            ("speaker_tolerance", cli.speaker_tolerance),
            ("live_interval", cli.live_interval),
            ("live_min_seconds", cli.live_min_seconds),
            ("finalize_lag", cli.finalize_lag),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("--{name} must be a finite, non-negative number (got {value})");
            }
        }

        let diar_backend =
            DiarBackend::from_str(&cli.diar_backend).with_context(|| "invalid --diar-backend")?;

        std::fs::create_dir_all(&cli.output_dir)
            .with_context(|| format!("failed to create output directory {:?}", cli.output_dir))?;

        Ok(Self {
            output_dir: cli.output_dir,
            transcribe_stream: cli.transcribe_stream,
            diar_backend,
            diar_model: cli.diar_model,
            asr_model: cli.asr_model,
            language: cli.language,
            gap_threshold: cli.gap_threshold,
            max_turn_duration: cli.max_turn_duration,
            speaker_tolerance: cli.speaker_tolerance,
            live_interval: cli.live_interval,
            live_min_seconds: cli.live_min_seconds,
            finalize_lag: cli.finalize_lag,
            emit_meters: cli.emit_meters,
            keep_raw: cli.keep_raw,
            keep_container: cli.keep_container,
            no_live: cli.no_live,
            verbose: cli.verbose,
        })
    }

    #[must_use]
    pub fn wants_stream(&self, stream: meetcap_core::frame::StreamId) -> bool {
        use meetcap_core::frame::StreamId;
        match (self.transcribe_stream, stream) {
            (TranscribeStream::Both, _) => true,
            (TranscribeStream::System, StreamId::System) => true,
            (TranscribeStream::Mic, StreamId::Mic) => true,
            _ => false,
        }
    }
}
