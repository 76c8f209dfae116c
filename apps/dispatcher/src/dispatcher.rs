// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Top-level dispatch loop: a dedicated blocking thread parses frames off
//! stdin and forwards them over a bounded channel to this async loop, which
//! routes `START`/`AUDIO`/`SCREENSHOT`/`STOP` to the state, aligner, and live
//! processors (mirroring the teacher's blocking-demux-feeds-async-loop shape
//! used for its own container demuxers).

use std::collections::HashMap;
use std::sync::Arc;

use meetcap_core::emitter::TranscriptEmitter;
use meetcap_core::engines::{DiarBackend, FfmpegNormaliser};
use meetcap_core::events::OutputEvent;
use meetcap_core::frame::{read_frame, Frame, FrameError, FrameType, StreamId};
use meetcap_core::pipeline::PipelineDriver;
use meetcap_core::writer::StreamWriter;

use crate::config::Config;
use crate::live_processor::{self, LiveProcessorHandle};
use crate::output::OutputSink;
use crate::state::{AppState, MeetingMeta};

const FRAME_CHANNEL_CAPACITY: usize = 32;

/// Placeholder diarisers/ASR: the concrete ML backends are external
/// collaborators (see `meetcap_core::engines`); nothing here implements them.
mod unimplemented_engines {
    use std::path::Path;

    use meetcap_core::engines::{AsrEngine, Diariser};
    use meetcap_core::error::{CoreError, Result};
    use meetcap_core::types::{DiarSegment, Word};

    pub struct ExternalAsr {
        pub model: String,
    }
    impl AsrEngine for ExternalAsr {
        fn transcribe(&self, _audio_path: &Path, _language: Option<&str>) -> Result<(String, Vec<Word>)> {
            Err(CoreError::Engine(format!(
                "no ASR backend wired in for model {:?}; provide one via meetcap_core::engines::AsrEngine",
                self.model
            )))
        }
    }

    pub struct ExternalDiariser {
        pub backend: super::DiarBackend,
        pub model: String,
    }
    impl Diariser for ExternalDiariser {
        fn diarise(&self, _audio_path: &Path) -> Result<Vec<DiarSegment>> {
            Err(CoreError::Engine(format!(
                "no diarisation backend wired in for {}/{}; provide one via meetcap_core::engines::Diariser",
                self.backend.as_str(),
                self.model
            )))
        }
    }
}

fn spawn_frame_reader() -> tokio::sync::mpsc::Receiver<Result<Frame, FrameError>> {
    let (tx, rx) = tokio::sync::mpsc::channel(FRAME_CHANNEL_CAPACITY);
    tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        let mut lock = stdin.lock();
        loop {
            match read_frame(&mut lock) {
                Ok(Some(frame)) => {
                    if tx.blocking_send(Ok(frame)).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(FrameError::UnexpectedEnd) => break,
                Err(err) => {
                    let _ = tx.blocking_send(Err(err));
                    break;
                }
            }
        }
    });
    rx
}

fn rms(payload: &[u8]) -> f64 {
    if payload.len() < 2 {
        return 0.0;
    }
    let samples = payload.len() / 2;
    let sum_sq: f64 = payload
        .chunks_exact(2)
        .map(|c| {
            let s = i16::from_le_bytes([c[0], c[1]]);
            let n = f64::from(s) / 32768.0;
            n * n
        })
        .sum();
    (sum_sq / samples as f64).sqrt()
}

/// Runs the dispatcher to completion. Returns the process exit code.
pub async fn run(config: Config) -> anyhow::Result<i32> {
    let config = Arc::new(config);
    let state = Arc::new(AppState::new());
    let output = Arc::new(OutputSink::new());
    let emitter = Arc::new(TranscriptEmitter::new());

    let mut frames = spawn_frame_reader();
    let mut processors: HashMap<StreamId, LiveProcessorHandle> = HashMap::new();
    let mut saw_protocol_error = false;
    // Single process-wide gate: at most one pipeline execution runs at a
    // time across every stream's live processor.
    let pipeline_gate = Arc::new(tokio::sync::Mutex::new(()));

    let mut stopped_cleanly = false;

    loop {
        let Some(incoming) = frames.recv().await else { break };
        let frame = match incoming {
            Ok(frame) => frame,
            Err(err) => {
                output.emit(OutputEvent::error(format!("protocol error: {err}"))).await?;
                saw_protocol_error = true;
                break;
            }
        };

        match frame.frame_type {
            FrameType::Start => {
                let meta: serde_json::Value = serde_json::from_slice(&frame.payload).unwrap_or_default();
                let sample_rate = meta.get("sample_rate").and_then(serde_json::Value::as_u64).unwrap_or(48_000) as u32;
                let channels = meta.get("channels").and_then(serde_json::Value::as_u64).unwrap_or(1) as u32;
                state.start_meeting(MeetingMeta { sample_rate, channels });

                // Every stream is persisted regardless of --transcribe-stream; that
                // flag only gates which streams get a live transcription processor.
                for stream in [StreamId::System, StreamId::Mic] {
                    let stem = config.output_dir.join(stream.as_str());
                    let writer = StreamWriter::open(&stem, sample_rate, channels)?;
                    state.open_stream(stream, writer);

                    if !config.wants_stream(stream) || config.no_live {
                        continue;
                    }

                    let diar_backend = config.diar_backend;
                    let pipeline = PipelineDriver::with_gate(
                        Arc::new(FfmpegNormaliser),
                        Arc::new(unimplemented_engines::ExternalAsr { model: config.asr_model.clone() }),
                        Arc::new(unimplemented_engines::ExternalDiariser {
                            backend: diar_backend,
                            model: config.diar_model.clone(),
                        }),
                        Arc::clone(&pipeline_gate),
                    );

                    let handle = live_processor::spawn(
                        stream.as_str(),
                        Arc::clone(&state),
                        stream,
                        pipeline,
                        Arc::clone(&emitter),
                        Arc::clone(&output),
                        Arc::clone(&config),
                    );
                    processors.insert(stream, handle);
                }
                output
                    .emit(OutputEvent::Status {
                        message: "meeting_started".to_string(),
                        meta: Some(meta),
                        stream: None,
                        duration: None,
                        finalize: None,
                        turns: None,
                    })
                    .await?;
            }
            FrameType::Audio => {
                state.append(frame.stream, &frame.payload, frame.pts_us)?;
                if config.emit_meters {
                    output
                        .emit(OutputEvent::Meter {
                            stream: frame.stream.as_str().to_string(),
                            t: frame.pts_us as f64 / 1_000_000.0,
                            rms: rms(&frame.payload),
                        })
                        .await?;
                }
                if let Some(handle) = processors.get(&frame.stream) {
                    if let Some(snap) = state.snapshot(frame.stream)? {
                        handle.notify_duration(snap.duration_seconds());
                    }
                }
            }
            FrameType::Screenshot => {
                let payload: serde_json::Value =
                    serde_json::from_slice(&frame.payload).unwrap_or(serde_json::Value::Null);
                output.emit(OutputEvent::Screenshot { payload }).await?;
            }
            FrameType::Stop => {
                output.emit(OutputEvent::status("meeting_stopped")).await?;
                stopped_cleanly = true;
                break;
            }
        }
    }

    if !stopped_cleanly && !saw_protocol_error {
        output.emit(OutputEvent::status("meeting_stopped")).await?;
    }

    for (_, handle) in processors {
        handle.stop(true).await;
    }

    let closed = state.close_all();
    let mut any_audio = false;
    for (stream, bytes_written, raw_path, container_path) in &closed {
        if config.wants_stream(*stream) {
            if *bytes_written == 0 {
                output.emit(OutputEvent::error(format!("no audio received on stream {}", stream.as_str()))).await?;
            } else {
                any_audio = true;
            }
        }
        meetcap_core::writer::delete_stream_files(raw_path, container_path, config.keep_raw, config.keep_container);
    }

    if saw_protocol_error {
        return Ok(1);
    }
    Ok(i32::from(!any_audio))
}
