// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Orchestrates one normalise → ASR → diarise → merge pass over a snapshot,
//! serialised process-wide via a single mutex since the external engines
//! hold heavyweight, typically single-instance, models.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::engines::{AsrEngine, Diariser, Normaliser};
use crate::error::{CoreError, Result};
use crate::speaker::assign_speakers;
use crate::turns::words_to_turns;
use crate::types::MergedTranscript;
use crate::writer::{materialize_wav, Snapshot};

/// Drives the transcribe+diarise+merge pipeline. Cloned handles share the
/// same single-flight mutex, so only one [`PipelineDriver::run`] call across
/// every clone executes at a time.
#[derive(Clone)]
pub struct PipelineDriver {
    normaliser: Arc<dyn Normaliser>,
    asr: Arc<dyn AsrEngine>,
    diariser: Arc<dyn Diariser>,
    gate: Arc<Mutex<()>>,
}

impl PipelineDriver {
    /// Creates a driver with its own single-flight gate. Suitable for
    /// standalone/test use; production callers with multiple streams should
    /// use [`Self::with_gate`] so every stream serialises through the same
    /// process-wide mutex.
    #[must_use]
    pub fn new(normaliser: Arc<dyn Normaliser>, asr: Arc<dyn AsrEngine>, diariser: Arc<dyn Diariser>) -> Self {
        Self::with_gate(normaliser, asr, diariser, Arc::new(Mutex::new(())))
    }

    /// Creates a driver sharing `gate` with other drivers, so that at most
    /// one pipeline execution across all of them runs at a time.
    #[must_use]
    pub fn with_gate(
        normaliser: Arc<dyn Normaliser>,
        asr: Arc<dyn AsrEngine>,
        diariser: Arc<dyn Diariser>,
        gate: Arc<Mutex<()>>,
    ) -> Self {
        Self { normaliser, asr, diariser, gate }
    }

    /// Runs one pipeline pass over `snapshot`, materialising an ephemeral
    /// container file under `work_dir` that is always removed afterwards.
    ///
    /// Returns `Ok(None)` for an empty snapshot (nothing to process yet);
    /// this is not an error.
    pub async fn run(
        &self,
        snapshot: &Snapshot,
        work_dir: &Path,
        language: Option<&str>,
        gap_threshold: f64,
        speaker_tolerance: f64,
        max_turn_duration: f64,
    ) -> Result<Option<MergedTranscript>> {
        if snapshot.frame_aligned_size() == 0 {
            return Ok(None);
        }

        tracing::debug!(duration = snapshot.duration_seconds(), "waiting for pipeline gate");
        let _permit = self.gate.lock().await;

        let ephemeral_path = materialize_wav(snapshot, work_dir)?;
        tracing::debug!(path = %ephemeral_path.display(), "materialised ephemeral wav for pipeline run");
        let cleanup = scopeguard::guard(ephemeral_path.clone(), |path| {
            let _ = std::fs::remove_file(path);
        });

        let normaliser = Arc::clone(&self.normaliser);
        let asr = Arc::clone(&self.asr);
        let diariser = Arc::clone(&self.diariser);
        let work_dir = work_dir.to_path_buf();
        let language = language.map(str::to_string);
        let ephemeral_for_task = ephemeral_path.clone();

        let result = tokio::task::spawn_blocking(move || -> Result<MergedTranscript> {
            let normalised = normaliser.normalise(&ephemeral_for_task, &work_dir)?;
            let (_, words) = asr.transcribe(&normalised, language.as_deref())?;
            let segments = diariser.diarise(&normalised)?;
            let labelled = assign_speakers(&words, &segments, speaker_tolerance);
            let turns = words_to_turns(&labelled, gap_threshold, max_turn_duration);
            Ok(MergedTranscript { turns, words: labelled, segments })
        })
        .await
        .map_err(|e| CoreError::Pipeline(format!("pipeline task panicked: {e}")))?;

        drop(cleanup);
        match &result {
            Ok(merged) => tracing::debug!(turns = merged.turns.len(), "pipeline run produced merged transcript"),
            Err(err) => tracing::warn!(error = %err, "pipeline run failed"),
        }
        result.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::types::{DiarSegment, Word};

    struct PassthroughNormaliser;
    impl Normaliser for PassthroughNormaliser {
        fn normalise(&self, input: &Path, _dest_dir: &Path) -> Result<PathBuf> {
            Ok(input.to_path_buf())
        }
    }

    struct StubAsr;
    impl AsrEngine for StubAsr {
        fn transcribe(&self, _audio_path: &Path, _language: Option<&str>) -> Result<(String, Vec<Word>)> {
            Ok(("hello world".into(), vec![Word::new("hello", 0.0, 0.3), Word::new("world", 0.4, 0.8)]))
        }
    }

    struct StubDiariser;
    impl Diariser for StubDiariser {
        fn diarise(&self, _audio_path: &Path) -> Result<Vec<DiarSegment>> {
            Ok(vec![DiarSegment::new(0.0, 1.0, "spk0")])
        }
    }

    #[tokio::test]
    async fn empty_snapshot_is_a_no_op() {
        let driver =
            PipelineDriver::new(Arc::new(PassthroughNormaliser), Arc::new(StubAsr), Arc::new(StubDiariser));
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("s.pcm"), []).unwrap();
        let snapshot =
            Snapshot { raw_path: dir.path().join("s.pcm"), sample_rate: 16000, channels: 1, size_bytes: 0 };
        let result = driver.run(&snapshot, dir.path(), None, 0.8, 0.25, 60.0).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn runs_asr_diarise_and_merge_and_cleans_up_ephemeral_file() {
        let driver =
            PipelineDriver::new(Arc::new(PassthroughNormaliser), Arc::new(StubAsr), Arc::new(StubDiariser));
        let dir = tempfile::tempdir().unwrap();
        let raw_path = dir.path().join("s.pcm");
        std::fs::write(&raw_path, vec![0u8; 8]).unwrap();
        let snapshot = Snapshot { raw_path, sample_rate: 16000, channels: 1, size_bytes: 8 };

        let before: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        let merged = driver.run(&snapshot, dir.path(), None, 0.8, 0.25, 60.0).await.unwrap().unwrap();
        assert_eq!(merged.turns.len(), 1);
        assert_eq!(merged.turns[0].text, "hello world");

        let after: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(before.len(), after.len(), "ephemeral wav must be cleaned up");
    }
}
