// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Structured error types for the capture pipeline.
//!
//! All errors implement `Display`; callers that need to self-report via the
//! `error` event (rather than aborting) match on [`CoreError`] directly.

use thiserror::Error;

/// Main error type for the ingest/alignment/pipeline core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or unreadable framed-protocol input, distinct from a clean EOF.
    ///
    /// Examples:
    /// - A read failure other than end-of-stream while parsing a frame header.
    /// - A payload length that overflows available memory.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error on a stream's raw or container sink, or on a temp/ephemeral file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Container (WAV/RIFF) encode or decode error.
    #[error("codec error: {0}")]
    Codec(String),

    /// The external audio transcoder required for normalisation is unavailable.
    #[error("missing transcoder: {0}")]
    MissingTranscoder(String),

    /// An external engine (ASR or diariser) reported a failure.
    #[error("engine error: {0}")]
    Engine(String),

    /// A pipeline precondition was not met (e.g. snapshotting an empty stream).
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// Configuration or parameter validation error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Convenience alias for Results using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::Configuration("negative finalize_lag".to_string());
        assert_eq!(err.to_string(), "configuration error: negative finalize_lag");

        let err = CoreError::Engine("asr model crashed".to_string());
        assert_eq!(err.to_string(), "engine error: asr model crashed");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CoreError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_missing_transcoder_message() {
        let err = CoreError::MissingTranscoder("ffmpeg not found on PATH".to_string());
        assert_eq!(err.to_string(), "missing transcoder: ffmpeg not found on PATH");
    }
}
