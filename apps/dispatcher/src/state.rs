// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Per-meeting state: the stream writers and the meeting's sample format,
//! guarded by a single mutex (`STATE_MUTEX` in the concurrency model) held
//! only for brief append/snapshot operations, never across a pipeline run.

use std::collections::HashMap;
use std::sync::Mutex;

use meetcap_core::error::Result;
use meetcap_core::frame::StreamId;
use meetcap_core::writer::{Snapshot, StreamWriter};

/// Meeting-wide audio format, set once on `START`.
#[derive(Debug, Clone, Copy)]
pub struct MeetingMeta {
    pub sample_rate: u32,
    pub channels: u32,
}

impl Default for MeetingMeta {
    fn default() -> Self {
        Self { sample_rate: 48_000, channels: 1 }
    }
}

#[derive(Default)]
struct Inner {
    meta: MeetingMeta,
    writers: HashMap<StreamId, StreamWriter>,
}

/// Holds every open stream writer for the meeting. Cheap to lock: all
/// operations are a single append or snapshot, never a pipeline call.
#[derive(Default)]
pub struct AppState {
    inner: Mutex<Inner>,
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_meeting(&self, meta: MeetingMeta) {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.meta = meta;
    }

    #[must_use]
    pub fn meta(&self) -> MeetingMeta {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).meta
    }

    pub fn open_stream(&self, stream: StreamId, writer: StreamWriter) {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.writers.insert(stream, writer);
    }

    pub fn append(&self, stream: StreamId, payload: &[u8], pts_us: i64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(writer) = inner.writers.get_mut(&stream) {
            meetcap_core::aligner::write_aligned_audio(writer, payload, pts_us)?;
        }
        Ok(())
    }

    pub fn snapshot(&self, stream: StreamId) -> Result<Option<Snapshot>> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.writers.get_mut(&stream).map(StreamWriter::snapshot).transpose()
    }

    pub fn has_writer(&self, stream: StreamId) -> bool {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).writers.contains_key(&stream)
    }

    /// Closes and removes every open writer, returning `(stream, bytes_written, raw_path, container_path)`.
    pub fn close_all(&self) -> Vec<(StreamId, u64, std::path::PathBuf, std::path::PathBuf)> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let writers = std::mem::take(&mut inner.writers);
        let mut closed = Vec::new();
        for (stream, writer) in writers {
            let bytes_written = writer.bytes_written();
            let raw_path = writer.raw_path().to_path_buf();
            let container_path = writer.container_path().to_path_buf();
            let _ = writer.close();
            closed.push((stream, bytes_written, raw_path, container_path));
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new();
        state.start_meeting(MeetingMeta { sample_rate: 8000, channels: 1 });
        let writer = StreamWriter::open(&dir.path().join("system"), 8000, 1).unwrap();
        state.open_stream(StreamId::System, writer);

        state.append(StreamId::System, &[1, 0, 2, 0], 0).unwrap();
        let snap = state.snapshot(StreamId::System).unwrap().unwrap();
        assert_eq!(snap.size_bytes, 4);
    }

    #[test]
    fn append_to_unopened_stream_is_a_no_op() {
        let state = AppState::new();
        assert!(state.append(StreamId::Mic, &[0, 0], 0).is_ok());
        assert!(!state.has_writer(StreamId::Mic));
    }
}
