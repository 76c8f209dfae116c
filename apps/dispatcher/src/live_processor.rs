// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! One cooperative worker per captured stream: periodically snapshots the
//! stream, decides whether enough new audio has accumulated, and if so runs
//! the pipeline and hands the result to the emitter.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use meetcap_core::emitter::TranscriptEmitter;
use meetcap_core::pipeline::PipelineDriver;
use meetcap_core::writer::Snapshot;

use crate::config::Config;
use crate::output::OutputSink;
use crate::state::AppState;

const WAKE_TIMEOUT: Duration = Duration::from_millis(500);

/// Shared signalling block between the dispatcher and a live processor task.
struct Shared {
    current_duration_bits: AtomicU64,
    stop_requested: AtomicBool,
    finalize_on_stop: AtomicBool,
    notify: tokio::sync::Notify,
}

impl Shared {
    fn current_duration(&self) -> f64 {
        f64::from_bits(self.current_duration_bits.load(Ordering::Acquire))
    }
}

/// A handle used by the dispatcher to notify and stop a running processor.
pub struct LiveProcessorHandle {
    shared: Arc<Shared>,
    join: tokio::task::JoinHandle<()>,
}

impl LiveProcessorHandle {
    /// Records new durable-byte progress and wakes the worker.
    pub fn notify_duration(&self, duration: f64) {
        self.shared.current_duration_bits.store(duration.to_bits(), Ordering::Release);
        self.shared.notify.notify_one();
    }

    /// Requests shutdown, optionally running one final `finalize=true` pass,
    /// and waits for the worker to exit.
    pub async fn stop(self, finalize: bool) {
        self.shared.finalize_on_stop.store(finalize, Ordering::Release);
        self.shared.stop_requested.store(true, Ordering::Release);
        self.shared.notify.notify_one();
        let _ = self.join.await;
    }
}

#[allow(clippy::too_many_arguments)]
pub fn spawn(
    stream_name: &'static str,
    state: Arc<AppState>,
    stream: meetcap_core::frame::StreamId,
    pipeline: PipelineDriver,
    emitter: Arc<TranscriptEmitter>,
    output: Arc<OutputSink>,
    config: Arc<Config>,
) -> LiveProcessorHandle {
    let shared = Arc::new(Shared {
        current_duration_bits: AtomicU64::new(0),
        stop_requested: AtomicBool::new(false),
        finalize_on_stop: AtomicBool::new(false),
        notify: tokio::sync::Notify::new(),
    });

    let worker_shared = Arc::clone(&shared);
    let join = tokio::spawn(async move {
        run_loop(stream_name, state, stream, pipeline, emitter, output, config, worker_shared).await;
    });

    LiveProcessorHandle { shared, join }
}

#[allow(clippy::too_many_arguments)]
async fn run_loop(
    stream_name: &'static str,
    state: Arc<AppState>,
    stream: meetcap_core::frame::StreamId,
    pipeline: PipelineDriver,
    emitter: Arc<TranscriptEmitter>,
    output: Arc<OutputSink>,
    config: Arc<Config>,
    shared: Arc<Shared>,
) {
    let mut last_processed_duration = 0.0_f64;

    loop {
        let _ = tokio::time::timeout(WAKE_TIMEOUT, shared.notify.notified()).await;

        let stop_requested = shared.stop_requested.load(Ordering::Acquire);
        let finalize = stop_requested && shared.finalize_on_stop.load(Ordering::Acquire);

        if stop_requested && !finalize {
            break;
        }

        if let Err(err) =
            maybe_process(stream_name, &state, stream, &pipeline, &emitter, &output, &config, finalize, &mut last_processed_duration)
                .await
        {
            tracing::warn!(stream = stream_name, error = %err, "pipeline run failed");
            let _ = output.emit(meetcap_core::events::OutputEvent::error(format!("{stream_name}: {err}"))).await;
        }

        if stop_requested {
            break;
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn maybe_process(
    stream_name: &'static str,
    state: &AppState,
    stream: meetcap_core::frame::StreamId,
    pipeline: &PipelineDriver,
    emitter: &TranscriptEmitter,
    output: &OutputSink,
    config: &Config,
    finalize: bool,
    last_processed_duration: &mut f64,
) -> anyhow::Result<()> {
    let Some(snapshot) = state.snapshot(stream)? else { return Ok(()) };
    let duration = snapshot.duration_seconds();

    if !finalize {
        if duration < config.live_min_seconds || duration - *last_processed_duration < config.live_interval {
            return Ok(());
        }
    }

    run_pipeline_and_emit(stream_name, &snapshot, pipeline, emitter, output, config, duration, finalize).await?;
    *last_processed_duration = last_processed_duration.max(duration);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_pipeline_and_emit(
    stream_name: &'static str,
    snapshot: &Snapshot,
    pipeline: &PipelineDriver,
    emitter: &TranscriptEmitter,
    output: &OutputSink,
    config: &Config,
    duration: f64,
    finalize: bool,
) -> anyhow::Result<()> {
    output
        .emit(meetcap_core::events::OutputEvent::Status {
            message: "live_process_start".to_string(),
            meta: None,
            stream: Some(stream_name.to_string()),
            duration: Some(duration),
            finalize: Some(finalize),
            turns: None,
        })
        .await?;

    let merged = pipeline
        .run(
            snapshot,
            &config.output_dir,
            config.language.as_deref(),
            config.gap_threshold,
            config.speaker_tolerance,
            config.max_turn_duration,
        )
        .await?;

    let Some(merged) = merged else { return Ok(()) };

    output
        .emit(meetcap_core::events::OutputEvent::Status {
            message: "live_process_done".to_string(),
            meta: None,
            stream: Some(stream_name.to_string()),
            duration: Some(duration),
            finalize: Some(finalize),
            turns: Some(merged.turns.len()),
        })
        .await?;

    let events = emitter.emit(&merged, duration, finalize, config.finalize_lag, Some(stream_name));
    for event in events {
        output.emit(event).await?;
    }
    Ok(())
}
